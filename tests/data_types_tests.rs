use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use ttl_cache::LocalCache;

#[derive(Debug, Clone, PartialEq)]
struct User {
    id: u32,
    name: String,
    email: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Product {
    id: String,
    name: String,
    price: f64,
    in_stock: bool,
}

#[tokio::test]
async fn test_struct_cache() {
    let cache: LocalCache<User> = LocalCache::new().unwrap();
    let user = User {
        id: 123,
        name: "User123".to_string(),
        email: "user123@example.com".to_string(),
    };
    cache.set("user:123", user.clone(), Duration::from_secs(1));

    let cached = cache.get("user:123").unwrap();
    assert_eq!(cached, user);
}

#[tokio::test]
async fn test_vec_cache() {
    let cache: LocalCache<Vec<i32>> = LocalCache::new().unwrap();
    cache.set("numbers", (0..5).collect(), Duration::ZERO);

    assert_eq!(cache.get("numbers").unwrap(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_hashmap_cache() {
    let cache: LocalCache<HashMap<String, Product>> = LocalCache::new().unwrap();

    let mut products = HashMap::new();
    products.insert(
        "prod1".to_string(),
        Product {
            id: "prod1".to_string(),
            name: "Electronics Product 1".to_string(),
            price: 99.99,
            in_stock: true,
        },
    );
    products.insert(
        "prod2".to_string(),
        Product {
            id: "prod2".to_string(),
            name: "Electronics Product 2".to_string(),
            price: 149.99,
            in_stock: false,
        },
    );
    cache.set("Electronics", products, Duration::from_secs(1));

    let products = cache.get("Electronics").unwrap();
    assert_eq!(products.len(), 2);
    assert!(products.contains_key("prod1"));
    assert_eq!(products["prod1"].name, "Electronics Product 1");
    assert!(!products["prod2"].in_stock);
}

#[tokio::test]
async fn test_shared_values_are_not_copied() {
    let cache: LocalCache<Arc<Vec<u8>>> = LocalCache::new().unwrap();
    let blob = Arc::new(vec![0u8; 4096]);
    cache.set("blob", Arc::clone(&blob), Duration::ZERO);

    let cached = cache.get("blob").unwrap();
    assert!(Arc::ptr_eq(&cached, &blob));
}

#[tokio::test]
async fn test_option_values() {
    let cache: LocalCache<Option<u64>> = LocalCache::new().unwrap();
    cache.set("present", Some(7), Duration::ZERO);
    cache.set("negative", None, Duration::ZERO);

    assert_eq!(cache.get("present").unwrap(), Some(7));
    // A stored `None` is a hit, not a miss.
    assert_eq!(cache.get("negative").unwrap(), None);
    assert!(cache.get("absent").is_err());
}

#[tokio::test]
async fn test_unicode_and_empty_keys() {
    let cache: LocalCache<&'static str> = LocalCache::new().unwrap();
    cache.set("", "empty", Duration::ZERO);
    cache.set("ключ", "cyrillic", Duration::ZERO);
    cache.set("键", "cjk", Duration::ZERO);

    assert_eq!(cache.get("").unwrap(), "empty");
    assert_eq!(cache.get("ключ").unwrap(), "cyrillic");
    assert_eq!(cache.get("键").unwrap(), "cjk");
}

#[tokio::test]
async fn test_tuple_values() {
    let cache: LocalCache<(String, u32)> = LocalCache::new().unwrap();
    cache.set("page", ("Electronics".to_string(), 2), Duration::ZERO);

    let (category, page) = cache.get("page").unwrap();
    assert_eq!(format!("{}:page{}", category, page), "Electronics:page2");
}
