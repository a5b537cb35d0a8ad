//! Readers racing a committing writer must always observe a clean
//! snapshot boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;
use std::thread;

use nogdb::{Context, RecordId, Result, TxnMode};

const PERSON: u16 = 1;
const GHOST: u16 = 2;
const VERSIONS: u32 = 50;
const READERS: usize = 4;
const SAMPLES: usize = 40;

fn person(position: u32) -> RecordId {
    RecordId::new(PERSON, position)
}

#[test]
fn snapshots_are_prefixes_of_the_writer_history() -> Result<()> {
    let ctx = Context::in_memory();
    let done = AtomicBool::new(false);
    let barrier = Barrier::new(READERS + 1);

    thread::scope(|scope| {
        let writer = scope.spawn(|| -> Result<()> {
            barrier.wait();
            // Version v creates vertex v; even versions also stage a ghost
            // vertex that is rolled back before the commit.
            for version in 1..=VERSIONS {
                if version % 2 == 0 {
                    let mut aborted = ctx.begin(TxnMode::ReadWrite)?;
                    aborted.create_vertex(RecordId::new(GHOST, version))?;
                    aborted.rollback()?;
                }
                let mut txn = ctx.begin(TxnMode::ReadWrite)?;
                txn.create_vertex(person(version))?;
                txn.commit()?;
            }
            done.store(true, Ordering::SeqCst);
            Ok(())
        });

        let mut readers = Vec::new();
        for _ in 0..READERS {
            readers.push(scope.spawn(|| -> Result<()> {
                barrier.wait();
                let mut samples = 0;
                while samples < SAMPLES {
                    let txn = ctx.begin(TxnMode::ReadOnly)?;
                    let snapshot = txn.version_id();
                    assert!(snapshot <= u64::from(VERSIONS));
                    for version in 1..=VERSIONS {
                        let expected = u64::from(version) <= snapshot;
                        assert_eq!(
                            txn.vertex_exists(person(version)),
                            expected,
                            "vertex {version} vs snapshot {snapshot}"
                        );
                        assert!(!txn.vertex_exists(RecordId::new(GHOST, version)));
                    }
                    drop(txn);
                    samples += 1;
                    if done.load(Ordering::SeqCst) {
                        break;
                    }
                    thread::yield_now();
                }
                Ok(())
            }));
        }

        writer.join().unwrap()?;
        for reader in readers {
            reader.join().unwrap()?;
        }
        Ok::<(), nogdb::NogError>(())
    })?;

    // With every reader gone, the final writer state is fully visible.
    let txn = ctx.begin(TxnMode::ReadOnly)?;
    assert_eq!(txn.version_id(), u64::from(VERSIONS));
    assert!(txn.vertex_exists(person(VERSIONS)));
    Ok(())
}

#[test]
fn deletions_respect_concurrent_snapshots() -> Result<()> {
    let ctx = Context::in_memory();

    for version in 1..=VERSIONS {
        let mut txn = ctx.begin(TxnMode::ReadWrite)?;
        txn.create_vertex(person(version))?;
        txn.commit()?;
    }

    let barrier = Barrier::new(READERS + 1);
    thread::scope(|scope| {
        let writer = scope.spawn(|| -> Result<()> {
            barrier.wait();
            // Version VERSIONS + i deletes vertex i.
            for version in 1..=VERSIONS {
                let mut txn = ctx.begin(TxnMode::ReadWrite)?;
                txn.delete_vertex(person(version))?;
                txn.commit()?;
            }
            Ok(())
        });

        let mut readers = Vec::new();
        for _ in 0..READERS {
            readers.push(scope.spawn(|| -> Result<()> {
                barrier.wait();
                for _ in 0..SAMPLES {
                    let txn = ctx.begin(TxnMode::ReadOnly)?;
                    let snapshot = txn.version_id();
                    let deleted_up_to = snapshot.saturating_sub(u64::from(VERSIONS));
                    for version in 1..=VERSIONS {
                        let expected = u64::from(version) > deleted_up_to;
                        assert_eq!(
                            txn.vertex_exists(person(version)),
                            expected,
                            "vertex {version} vs snapshot {snapshot}"
                        );
                    }
                    drop(txn);
                    thread::yield_now();
                }
                Ok(())
            }));
        }

        writer.join().unwrap()?;
        for reader in readers {
            reader.join().unwrap()?;
        }
        Ok::<(), nogdb::NogError>(())
    })?;

    // Every reader has exited, so the last reclamation pass ran and the
    // deleted vertices are physically gone.
    let mut txn = ctx.begin(TxnMode::ReadWrite)?;
    txn.commit()?;
    assert_eq!(ctx.graph().vertex_count(), 0);
    Ok(())
}
