use file_map::FileMap;

fn main() -> Result<(), file_map::Error> {
    let path = std::env::temp_dir().join("file_map_demo").join("basic.bin");
    let db = FileMap::<String, i32>::open(&path)?;

    // insert / get / remove
    db.insert("apples".into(), 3);
    db.insert("bananas".into(), 5);
    println!("apples  = {:?}", db.get(&"apples".into()));
    println!("bananas = {:?}", db.remove(&"bananas".into()));

    // update in place
    db.update(&"apples".into(), |n| *n += 1);
    println!("apples after update = {:?}", db.get(&"apples".into()));

    let oranges = db.get_or_insert("oranges".into(), 0);
    println!("oranges (default 0) = {oranges}");

    db.extend(vec![("grapes".into(), 12), ("lemons".into(), 7)]);
    println!("keys = {:?}", db.keys());
    println!("len  = {}", db.len());

    // final save
    db.close()?;
    let reopened = FileMap::<String, i32>::open(&path)?;
    println!("after reopen: {:?}", reopened.iter());

    drop(reopened);
    let _ = std::fs::remove_file(&path);
    Ok(())
}
