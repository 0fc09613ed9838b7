use importscope::cache::{content_hash, LayeredCache};
use importscope::config::CacheConfig;
use pretty_assertions::assert_eq;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn config(dir: &Path) -> CacheConfig {
    CacheConfig {
        sweep_interval_secs: 0,
        ..CacheConfig::in_directory(dir)
    }
}

fn tags(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_set_get_delete() {
    let dir = TempDir::new().unwrap();
    let cache = LayeredCache::open(&config(dir.path())).unwrap();

    cache.set("alpha", b"one", None, &[]).unwrap();
    assert_eq!(cache.get("alpha"), Some(b"one".to_vec()));
    assert!(cache.delete("alpha"));
    assert_eq!(cache.get("alpha"), None);
    assert!(!cache.delete("alpha"));

    let stats = cache.stats();
    assert_eq!(stats.memory_hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.disk_entries, 0);
}

#[test]
fn test_entries_expire_after_ttl() {
    let dir = TempDir::new().unwrap();
    let cache = LayeredCache::open(&config(dir.path())).unwrap();

    cache
        .set("short", b"lived", Some(Duration::from_secs(1)), &[])
        .unwrap();
    cache.set("long", b"lived", None, &[]).unwrap();
    thread::sleep(Duration::from_secs(2));

    assert_eq!(cache.get("short"), None);
    assert_eq!(cache.get("long"), Some(b"lived".to_vec()));
    assert!(cache.stats().expirations >= 1);
}

#[test]
fn test_purge_removes_expired_entries_from_both_tiers() {
    let dir = TempDir::new().unwrap();
    let cache = LayeredCache::open(&config(dir.path())).unwrap();

    cache
        .set("short", b"lived", Some(Duration::from_millis(100)), &[])
        .unwrap();
    thread::sleep(Duration::from_millis(300));

    assert!(cache.purge_expired() >= 1);
    let stats = cache.stats();
    assert_eq!(stats.memory_entries, 0);
    assert_eq!(stats.disk_entries, 0);
}

#[test]
fn test_persists_and_promotes_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let cache = LayeredCache::open(&config(dir.path())).unwrap();
        cache.set("kept", b"payload", None, &[]).unwrap();
    }

    let cache = LayeredCache::open(&config(dir.path())).unwrap();
    assert_eq!(cache.get("kept"), Some(b"payload".to_vec()));
    assert_eq!(cache.get("kept"), Some(b"payload".to_vec()));

    let stats = cache.stats();
    assert_eq!(stats.disk_hits, 1);
    assert_eq!(stats.memory_hits, 1);
    assert_eq!(stats.memory_entries, 1);
}

#[test]
fn test_truncated_entry_file_reads_as_miss() {
    let dir = TempDir::new().unwrap();
    {
        let cache = LayeredCache::open(&config(dir.path())).unwrap();
        cache.set("victim", b"0123456789", None, &[]).unwrap();
    }

    let entry = dir
        .path()
        .join("entries")
        .join(format!("{}.entry", content_hash(b"victim")));
    assert!(entry.exists());
    std::fs::write(&entry, b"012").unwrap();

    let cache = LayeredCache::open(&config(dir.path())).unwrap();
    assert_eq!(cache.get("victim"), None);
    assert!(!entry.exists());
    assert_eq!(cache.stats().disk_entries, 0);
}

#[test]
fn test_corrupt_index_starts_empty() {
    let dir = TempDir::new().unwrap();
    {
        let cache = LayeredCache::open(&config(dir.path())).unwrap();
        cache.set("a", b"value", None, &[]).unwrap();
    }
    std::fs::write(dir.path().join("index.json"), b"{ not json").unwrap();

    let cache = LayeredCache::open(&config(dir.path())).unwrap();
    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.stats().disk_entries, 0);
    cache.set("a", b"again", None, &[]).unwrap();
    assert_eq!(cache.get("a"), Some(b"again".to_vec()));
}

#[test]
fn test_memory_tier_evicts_least_recently_used() {
    let dir = TempDir::new().unwrap();
    let cache = LayeredCache::open(&CacheConfig {
        max_memory_entries: 2,
        ..config(dir.path())
    })
    .unwrap();

    cache.set("a", b"1", None, &[]).unwrap();
    cache.set("b", b"2", None, &[]).unwrap();
    assert!(cache.get("a").is_some());
    cache.set("c", b"3", None, &[]).unwrap();

    let stats = cache.stats();
    assert_eq!(stats.memory_entries, 2);
    assert_eq!(stats.disk_entries, 3);
    assert_eq!(stats.evictions, 1);

    // b was evicted from memory only
    assert_eq!(cache.get("b"), Some(b"2".to_vec()));
    assert_eq!(cache.stats().disk_hits, 1);
}

#[test]
fn test_disk_budget_evicts_oldest_entries() {
    let dir = TempDir::new().unwrap();
    let cache = LayeredCache::open(&CacheConfig {
        max_disk_bytes: 10,
        ..config(dir.path())
    })
    .unwrap();

    cache.set("first", b"aaaa", None, &[]).unwrap();
    thread::sleep(Duration::from_millis(20));
    cache.set("second", b"bbbb", None, &[]).unwrap();
    thread::sleep(Duration::from_millis(20));
    cache.set("third", b"cccc", None, &[]).unwrap();

    let stats = cache.stats();
    assert!(stats.disk_bytes <= 10);
    assert_eq!(stats.disk_entries, 2);
    assert!(cache.set("huge", &[0u8; 32], None, &[]).is_err());
}

#[test]
fn test_clear_by_tag() {
    let dir = TempDir::new().unwrap();
    let cache = LayeredCache::open(&config(dir.path())).unwrap();

    cache.set("a", b"1", None, &tags(&["analysis", "script:a.py"])).unwrap();
    cache.set("b", b"2", None, &tags(&["analysis", "script:b.py"])).unwrap();
    cache.set("c", b"3", None, &tags(&["other"])).unwrap();

    assert_eq!(cache.clear(Some(tags(&["script:a.py"]).as_slice())), 1);
    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.clear(Some(tags(&["analysis"]).as_slice())), 1);
    assert_eq!(cache.get("c"), Some(b"3".to_vec()));
    assert_eq!(cache.clear(None), 1);
    assert_eq!(cache.stats().disk_entries, 0);
}

#[test]
fn test_concurrent_writers_share_one_cache() {
    let dir = TempDir::new().unwrap();
    let cache = std::sync::Arc::new(LayeredCache::open(&config(dir.path())).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cache = std::sync::Arc::clone(&cache);
            thread::spawn(move || {
                let key = format!("key-{}", i);
                cache.set(&key, key.as_bytes(), None, &[]).unwrap();
                cache.get(&key)
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Some(format!("key-{}", i).into_bytes()));
    }
    assert_eq!(cache.stats().disk_entries, 8);
}
