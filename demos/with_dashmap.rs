use dashmap::DashMap;
use file_map::FileMap;
use std::time::Duration;

fn main() -> Result<(), file_map::Error> {
    let path = std::env::temp_dir().join("file_map_demo").join("dashmap.bin");

    let total = FileMap::<String, u64, DashMap<String, u64>>::builder(&path)
        .save_every(Duration::from_secs(2))
        .scoped(|db| {
            db.insert("counter".into(), 0);
            std::thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| {
                        for _ in 0..250 {
                            db.update(&"counter".into(), |v| *v += 1);
                        }
                    });
                }
            });
            db.get(&"counter".into())
        })?;
    println!("counter = {total:?}");

    let _ = std::fs::remove_file(&path);
    Ok(())
}
