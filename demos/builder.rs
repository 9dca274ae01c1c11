use file_map::{FileMap, JsonCodec};
use std::time::Duration;

fn main() -> Result<(), file_map::Error> {
    let path = std::env::temp_dir().join("file_map_demo").join("builder.json");

    // pretty-printed JSON + background save every 100ms
    let db = FileMap::<String, String>::builder(&path)
        .codec(JsonCodec::pretty())
        .save_every(Duration::from_millis(100))
        .on_save_error(|e| eprintln!("background save failed: {e}"))
        .build()?;

    db.insert("name".into(), "file-map".into());
    db.insert("status".into(), "saving".into());
    std::thread::sleep(Duration::from_millis(300));

    // the worker has written the file without any close
    let contents = std::fs::read_to_string(db.path())?;
    println!("On-disk JSON:\n{contents}");
    println!("\nDebug output: {db:?}");

    db.close()?;
    let _ = std::fs::remove_file(&path);
    Ok(())
}
