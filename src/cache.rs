// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bytes::Bytes;
use log::{debug, warn};

use crate::{conditional::Fingerprint, config::Config};

/// 缓存使用的时钟，测试中可以替换为可控的实现
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 缓存中保存的内容：解码后的文本，或原始字节
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Binary(Bytes),
}

struct CacheEntry<T> {
    uri: String,
    content: T,
    /// 写入时文件的指纹，命中时与内容一起返回
    fingerprint: Fingerprint,
    inserted_at: Instant,
}

type Store<T> = Mutex<HashMap<String, CacheEntry<T>>>;

/// 以请求 URI 为键、带存活时间的内存缓存。
///
/// 每个条目保存内容以及写入时的文件指纹，命中时两者总是成对返回。
/// 文本与二进制内容分开存放。过期条目只在查询时被移除，没有后台清理，也没有容量上限。
pub struct ContentCache {
    enabled: bool,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    text: Store<String>,
    binary: Store<Bytes>,
}

impl ContentCache {
    pub fn new(enabled: bool, ttl: Duration) -> Self {
        Self::with_clock(enabled, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(enabled: bool, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            enabled,
            ttl,
            clock,
            text: Mutex::new(HashMap::new()),
            binary: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.caching(), config.cache_ttl())
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    // 查询文本缓存
    pub fn lookup_text(&self, uri: &str) -> Option<(String, Fingerprint)> {
        self.lookup_in(&self.text, uri)
    }

    // 查询二进制缓存
    pub fn lookup_binary(&self, uri: &str) -> Option<(Bytes, Fingerprint)> {
        self.lookup_in(&self.binary, uri)
    }

    /// 无条件写入（覆盖）`uri` 对应的条目，时间戳取当前时钟。
    pub fn store(&self, uri: &str, content: Content, fingerprint: Fingerprint) {
        if !self.enabled {
            return;
        }
        match content {
            Content::Text(text) => self.store_in(&self.text, uri, text, fingerprint),
            Content::Binary(bytes) => self.store_in(&self.binary, uri, bytes, fingerprint),
        }
    }

    /// 两个存储中的条目总数（包括尚未被查询移除的过期条目）
    pub fn len(&self) -> usize {
        lock(&self.text).len() + lock(&self.binary).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup_in<T: Clone>(&self, store: &Store<T>, uri: &str) -> Option<(T, Fingerprint)> {
        if !self.enabled {
            return None;
        }
        let now = self.clock.now();
        // 检查年龄与移除过期条目必须在同一个临界区内完成
        let mut map = lock(store);
        let expired = match map.get(uri) {
            None => return None,
            Some(entry) => now.saturating_duration_since(entry.inserted_at) >= self.ttl,
        };
        if expired {
            if let Some(entry) = map.remove(uri) {
                debug!("缓存条目{}已过期，移除", entry.uri);
            }
            return None;
        }
        map.get(uri)
            .map(|entry| (entry.content.clone(), entry.fingerprint.clone()))
    }

    fn store_in<T>(&self, store: &Store<T>, uri: &str, content: T, fingerprint: Fingerprint) {
        let entry = CacheEntry {
            uri: uri.to_string(),
            content,
            fingerprint,
            inserted_at: self.clock.now(),
        };
        lock(store).insert(uri.to_string(), entry);
    }
}

fn lock<T>(store: &Mutex<T>) -> MutexGuard<'_, T> {
    match store.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("缓存锁被污染，恢复并继续");
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration as StdDuration, UNIX_EPOCH};

    fn fp(secs: u64) -> Fingerprint {
        Fingerprint::from_modified(UNIX_EPOCH + StdDuration::from_secs(secs))
    }

    fn text(cache: &ContentCache, uri: &str) -> Option<String> {
        cache.lookup_text(uri).map(|(text, _)| text)
    }

    /// 返回一个可以手动推进的模拟时钟
    fn manual_clock() -> (Arc<Mutex<Instant>>, Arc<dyn Clock>) {
        let current = Arc::new(Mutex::new(Instant::now()));
        let shared = Arc::clone(&current);
        let mut clock = MockClock::new();
        clock
            .expect_now()
            .returning(move || *shared.lock().unwrap());
        (current, Arc::new(clock))
    }

    fn advance(current: &Arc<Mutex<Instant>>, by: Duration) {
        let mut now = current.lock().unwrap();
        *now += by;
    }

    #[test]
    fn test_store_and_lookup() {
        let cache = ContentCache::new(true, Duration::from_secs(60));
        cache.store("/public/app.css", Content::Text("body {}".to_string()), fp(1));
        cache.store("/public/a.png", Content::Binary(Bytes::from_static(b"\x89PNG")), fp(1));

        assert_eq!(text(&cache, "/public/app.css").as_deref(), Some("body {}"));
        assert_eq!(
            cache.lookup_binary("/public/a.png"),
            Some((Bytes::from_static(b"\x89PNG"), fp(1)))
        );
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_text_and_binary_are_separate() {
        let cache = ContentCache::new(true, Duration::from_secs(60));
        cache.store("/public/x", Content::Text("text".to_string()), fp(1));

        assert!(cache.lookup_binary("/public/x").is_none());
        assert!(text(&cache, "/public/x").is_some());
    }

    #[test]
    fn test_keyed_by_uri() {
        let cache = ContentCache::new(true, Duration::from_secs(60));
        cache.store("/public/app.css", Content::Text("a".to_string()), fp(1));

        assert!(text(&cache, "/public/app.css/").is_none());
        assert!(text(&cache, "/public/app.css").is_some());
    }

    #[test]
    fn test_miss_on_empty_cache() {
        let cache = ContentCache::new(true, Duration::from_secs(60));
        assert!(text(&cache, "/public/none.js").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_valid_before_ttl() {
        let (current, clock) = manual_clock();
        let cache = ContentCache::with_clock(true, Duration::from_millis(60_000), clock);
        cache.store("/public/app.js", Content::Text("v1".to_string()), fp(1));

        advance(&current, Duration::from_millis(59_999));
        assert_eq!(text(&cache, "/public/app.js").as_deref(), Some("v1"));
    }

    #[test]
    fn test_expired_at_ttl_is_evicted_on_lookup() {
        let (current, clock) = manual_clock();
        let cache = ContentCache::with_clock(true, Duration::from_millis(60_000), clock);
        cache.store("/public/app.js", Content::Text("v1".to_string()), fp(1));
        cache.store("/public/a.png", Content::Binary(Bytes::from_static(b"img")), fp(1));

        advance(&current, Duration::from_millis(60_000));
        // 过期条目在被查询前仍然占用空间
        assert_eq!(cache.len(), 2);

        assert!(text(&cache, "/public/app.js").is_none());
        assert_eq!(cache.len(), 1);
        assert!(cache.lookup_binary("/public/a.png").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_store_overwrites_and_restamps() {
        let (current, clock) = manual_clock();
        let cache = ContentCache::with_clock(true, Duration::from_millis(1_000), clock);
        cache.store("/public/app.css", Content::Text("old".to_string()), fp(1));

        advance(&current, Duration::from_millis(800));
        cache.store("/public/app.css", Content::Text("new".to_string()), fp(2));

        advance(&current, Duration::from_millis(800));
        assert_eq!(
            cache.lookup_text("/public/app.css"),
            Some(("new".to_string(), fp(2)))
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_hit_returns_fingerprint_from_store_time() {
        let cache = ContentCache::new(true, Duration::from_secs(60));
        cache.store("/public/app.css", Content::Text("v1".to_string()), fp(1_600_000_000));

        let (body, fingerprint) = cache.lookup_text("/public/app.css").unwrap();
        assert_eq!(body, "v1");
        assert_eq!(fingerprint, fp(1_600_000_000));
        assert_ne!(fingerprint.etag(), fp(1_600_000_005).etag());
    }

    #[test]
    fn test_disabled_cache() {
        let cache = ContentCache::new(false, Duration::from_secs(60));
        cache.store("/public/app.css", Content::Text("body {}".to_string()), fp(1));

        assert!(!cache.enabled());
        assert!(text(&cache, "/public/app.css").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = Config::new().with_caching(false);
        assert!(!ContentCache::from_config(&config).enabled());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(ContentCache::new(true, Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for j in 0..100 {
                        let uri = format!("/public/{}-{}.css", i, j);
                        cache.store(&uri, Content::Text(uri.clone()), fp(1));
                        assert_eq!(text(&cache, &uri), Some(uri));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 800);
    }
}
