//! 品牌配色缓存：Logo URL → 取色结果。
//!
//! “没有配色”同样缓存，避免对单色 Logo 反复下载取色。

use std::num::NonZeroUsize;

use lru::LruCache;

use super::ThemeColorPair;

pub struct BrandThemeCache {
    entries: LruCache<String, Option<ThemeColorPair>>,
}

impl BrandThemeCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// 外层 None 表示未缓存，内层 None 表示已确认没有配色。
    pub fn get(&mut self, logo_url: &str) -> Option<Option<ThemeColorPair>> {
        self.entries.get(Self::key(logo_url)).cloned()
    }

    pub fn insert(&mut self, logo_url: &str, pair: Option<ThemeColorPair>) {
        self.entries.put(Self::key(logo_url).to_string(), pair);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(logo_url: &str) -> &str {
        logo_url.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::ColorSample;

    fn pair() -> Option<ThemeColorPair> {
        Some(ThemeColorPair::from_color(ColorSample::new(220, 20, 60)))
    }

    #[test]
    fn distinguishes_missing_from_no_theme() {
        let mut cache = BrandThemeCache::new(4);
        assert_eq!(cache.get("https://logo.example/a.png"), None);

        cache.insert("https://logo.example/a.png", None);
        assert_eq!(cache.get("https://logo.example/a.png"), Some(None));

        cache.insert(" https://logo.example/b.png ", pair());
        assert_eq!(cache.get("https://logo.example/b.png"), Some(pair()));
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = BrandThemeCache::new(2);
        cache.insert("a", None);
        cache.insert("b", None);
        // 访问 a 之后，b 成为最久未使用
        assert!(cache.get("a").is_some());
        cache.insert("c", pair());

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut cache = BrandThemeCache::new(0);
        cache.insert("a", None);
        assert!(!cache.is_empty());
    }
}
