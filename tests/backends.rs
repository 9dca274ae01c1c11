use file_map::{FileMap, JsonCodec};
use parking_lot::RwLock;
use shardmap::ShardMap;
use std::collections::HashMap;

#[test]
fn shardmap_insert_get_remove_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sm.bin");

    {
        let db = FileMap::<String, i32, ShardMap<String, i32>>::open(&path).unwrap();
        assert!(db.insert("a".into(), 1).is_none());
        assert_eq!(db.insert("a".into(), 2), Some(1));
        assert_eq!(db.remove(&"a".into()), Some(2));
        assert_eq!(db.get(&"a".into()), None);
        db.insert("b".into(), 3);
        assert!(db.update(&"b".into(), |v| *v += 1));
        db.close().unwrap();
    }

    let db2 = FileMap::<String, i32, ShardMap<String, i32>>::open(&path).unwrap();
    assert_eq!(db2.get(&"a".into()), None);
    assert_eq!(db2.get(&"b".into()), Some(4));
}

#[test]
fn shardmap_iter_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sm_iter.bin");
    let db = FileMap::<String, u8, ShardMap<String, u8>>::open(&path).unwrap();
    db.insert("x".into(), 10);
    db.insert("y".into(), 20);
    let mut entries = db.iter();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(entries, vec![("x".into(), 10), ("y".into(), 20)]);
    db.clear();
    assert!(db.is_empty());
}

#[test]
fn rwlock_hashmap_crud() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rwlock.bin");
    let db = FileMap::<String, i32, RwLock<HashMap<String, i32>>>::open(&path).unwrap();
    db.insert("k".into(), 100);
    assert_eq!(db.get(&"k".into()), Some(100));
    assert!(db.contains_key(&"k".into()));
    assert_eq!(db.len(), 1);
    db.remove(&"k".into());
    assert!(db.is_empty());
    db.flush().unwrap();
}

#[test]
fn backends_share_file_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.json");
    {
        let db = FileMap::<String, i32, ShardMap<String, i32>>::builder(&path)
            .codec(JsonCodec::new())
            .build()
            .unwrap();
        db.extend(vec![("one".into(), 1), ("two".into(), 2)]);
    }
    let db = FileMap::<String, i32>::builder(&path)
        .codec(JsonCodec::new())
        .build()
        .unwrap();
    assert_eq!(db.len(), 2);
    assert_eq!(db.get(&"two".into()), Some(2));
}

#[cfg(feature = "dashmap")]
mod dashmap_tests {
    use dashmap::DashMap;
    use file_map::FileMap;

    #[test]
    fn dashmap_crud() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashmap.bin");
        let db = FileMap::<String, i32, DashMap<String, i32>>::open(&path).unwrap();
        db.insert("a".into(), 1);
        assert_eq!(db.get(&"a".into()), Some(1));
        assert!(db.update(&"a".into(), |v| *v = 5));
        assert_eq!(db.get(&"a".into()), Some(5));
        assert_eq!(db.remove(&"a".into()), Some(5));
        assert!(db.is_empty());
        db.flush().unwrap();
    }

    #[test]
    fn dashmap_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashmap_persist.bin");
        {
            let db = FileMap::<String, String, DashMap<String, String>>::open(&path).unwrap();
            db.insert("key".into(), "val".into());
        }
        let db = FileMap::<String, String, DashMap<String, String>>::open(&path).unwrap();
        assert_eq!(db.get(&"key".into()), Some("val".into()));
    }
}
