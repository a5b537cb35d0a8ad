//! On-disk behavior: record plumbing, position allocation, and reopening
//! a context.

use nogdb::{ClassType, Context, PropertyType, RecordId, Result, Settings, TxnMode};
use tempfile::tempdir;

fn small_settings() -> Settings {
    Settings {
        map_size: 32 * 1024 * 1024,
        ..Default::default()
    }
}

#[test]
fn record_plumbing_roundtrip() -> Result<()> {
    let dir = tempdir().unwrap();
    let ctx = Context::open(dir.path(), small_settings())?;

    let mut writer = ctx.begin(TxnMode::ReadWrite)?;
    let person = writer.create_class("Person", ClassType::Vertex)?.id;
    let p1 = writer.next_position_id(person)?;
    let p2 = writer.next_position_id(person)?;
    assert_eq!((p1, p2), (1, 2));
    writer.put_record(RecordId::new(person, p1), b"alice")?;
    writer.put_record(RecordId::new(person, p2), b"bob")?;
    writer.create_vertex(RecordId::new(person, p1))?;
    writer.create_vertex(RecordId::new(person, p2))?;
    writer.commit()?;

    let mut reader = ctx.begin(TxnMode::ReadOnly)?;
    assert_eq!(
        reader.get_record(RecordId::new(person, p1))?.as_deref(),
        Some(&b"alice"[..])
    );
    assert_eq!(reader.record_ids(person)?, vec![1, 2]);
    drop(reader);

    let mut writer = ctx.begin(TxnMode::ReadWrite)?;
    assert!(writer.del_record(RecordId::new(person, p1))?);
    writer.commit()?;

    let mut reader = ctx.begin(TxnMode::ReadOnly)?;
    assert_eq!(reader.get_record(RecordId::new(person, p1))?, None);
    assert_eq!(reader.record_ids(person)?, vec![2]);
    Ok(())
}

#[test]
fn rollback_discards_record_writes() -> Result<()> {
    let dir = tempdir().unwrap();
    let ctx = Context::open(dir.path(), small_settings())?;

    let mut writer = ctx.begin(TxnMode::ReadWrite)?;
    let person = writer.create_class("Person", ClassType::Vertex)?.id;
    writer.commit()?;

    let mut writer = ctx.begin(TxnMode::ReadWrite)?;
    let position = writer.next_position_id(person)?;
    writer.put_record(RecordId::new(person, position), b"ghost")?;
    writer.rollback()?;

    let mut reader = ctx.begin(TxnMode::ReadOnly)?;
    assert_eq!(reader.get_record(RecordId::new(person, position))?, None);

    // The position watermark rolled back with the transaction.
    let mut writer = ctx.begin(TxnMode::ReadWrite)?;
    assert_eq!(writer.next_position_id(person)?, position);
    writer.commit()?;
    Ok(())
}

#[test]
fn schema_counters_and_records_survive_reopen() -> Result<()> {
    let dir = tempdir().unwrap();
    let (person, knows, position) = {
        let ctx = Context::open(dir.path(), small_settings())?;
        let mut writer = ctx.begin(TxnMode::ReadWrite)?;
        let person = writer.create_class("Person", ClassType::Vertex)?.id;
        let knows = writer.create_class("Knows", ClassType::Edge)?.id;
        writer.add_property(person, "name", PropertyType::Text)?;
        writer.add_property(person, "balance", PropertyType::BigInt)?;
        writer.set_super_class(knows, None)?;
        let position = writer.next_position_id(person)?;
        writer.put_record(RecordId::new(person, position), b"alice")?;
        writer.commit()?;
        (person, knows, position)
    };

    let ctx = Context::open(dir.path(), small_settings())?;
    let info = ctx.db_info();
    assert_eq!(info.num_classes, 2);
    assert_eq!(info.max_class_id, knows.max(person));
    assert_eq!(info.num_properties, 2);
    assert_eq!(info.max_property_id, 2);

    let mut reader = ctx.begin(TxnMode::ReadOnly)?;
    let restored = reader.class_by_name("Person").expect("class restored");
    assert_eq!(restored.id, person);
    assert_eq!(restored.class_type, ClassType::Vertex);
    let properties = reader.properties_of(person)?;
    assert_eq!(properties["name"].property_type, PropertyType::Text);
    assert_eq!(properties["balance"].property_type, PropertyType::BigInt);
    assert_eq!(reader.class_by_name("Knows").expect("edge class").id, knows);
    assert_eq!(
        reader.get_record(RecordId::new(person, position))?.as_deref(),
        Some(&b"alice"[..])
    );

    // Version and position sequences continue instead of restarting.
    let mut writer = ctx.begin(TxnMode::ReadWrite)?;
    assert!(writer.version_id() > 1);
    assert_eq!(writer.next_position_id(person)?, position + 1);
    let human = writer.create_class("Human", ClassType::Vertex)?;
    assert_eq!(human.id, knows.max(person) + 1);
    writer.commit()?;
    Ok(())
}

#[test]
fn dropped_classes_do_not_come_back_after_reopen() -> Result<()> {
    let dir = tempdir().unwrap();
    {
        let ctx = Context::open(dir.path(), small_settings())?;
        let mut writer = ctx.begin(TxnMode::ReadWrite)?;
        writer.create_class("Person", ClassType::Vertex)?;
        writer.create_class("Animal", ClassType::Vertex)?;
        writer.commit()?;
        let mut writer = ctx.begin(TxnMode::ReadWrite)?;
        writer.drop_class(1)?;
        writer.commit()?;
    }

    let ctx = Context::open(dir.path(), small_settings())?;
    let reader = ctx.begin(TxnMode::ReadOnly)?;
    assert!(reader.class_by_name("Person").is_none());
    assert!(reader.class_by_name("Animal").is_some());
    assert_eq!(ctx.db_info().num_classes, 1);
    Ok(())
}

#[test]
fn empty_class_keeps_the_position_watermark() -> Result<()> {
    let dir = tempdir().unwrap();
    let ctx = Context::open(dir.path(), small_settings())?;

    let mut writer = ctx.begin(TxnMode::ReadWrite)?;
    let person = writer.create_class("Person", ClassType::Vertex)?.id;
    for _ in 0..3 {
        let position = writer.next_position_id(person)?;
        writer.put_record(RecordId::new(person, position), b"row")?;
    }
    writer.empty_class(person)?;
    assert_eq!(writer.record_ids(person)?, Vec::<u32>::new());
    assert_eq!(writer.next_position_id(person)?, 4);
    writer.commit()?;
    Ok(())
}

#[test]
fn uncommitted_schema_is_not_reloaded() -> Result<()> {
    let dir = tempdir().unwrap();
    {
        let ctx = Context::open(dir.path(), small_settings())?;
        let mut writer = ctx.begin(TxnMode::ReadWrite)?;
        writer.create_class("Person", ClassType::Vertex)?;
        writer.commit()?;
        let mut writer = ctx.begin(TxnMode::ReadWrite)?;
        writer.create_class("Ghost", ClassType::Vertex)?;
        writer.rollback()?;
    }

    let ctx = Context::open(dir.path(), small_settings())?;
    let reader = ctx.begin(TxnMode::ReadOnly)?;
    assert!(reader.class_by_name("Person").is_some());
    assert!(reader.class_by_name("Ghost").is_none());
    Ok(())
}
