//! Translation of local mutations into remote table calls.

use crate::error::SyncResult;
use crate::op::SyncOp;
use crate::remote::{Filter, RemoteTable};
use serde_json::Value;
use tracing::{debug, warn};

/// Remote Mirror Client.
///
/// Maps each [`SyncOp`] onto the matching call against the remote
/// `security_logs` table, always correlating by `created_at` (never by
/// local id). Failures are returned to the caller, which routes them
/// into the sync queue; nothing here ever reaches the UI.
pub struct MirrorClient<R: RemoteTable> {
    remote: R,
}

impl<R: RemoteTable> MirrorClient<R> {
    /// Wraps a remote table client.
    pub fn new(remote: R) -> Self {
        Self { remote }
    }

    /// Access to the underlying remote client.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Attempts to deliver one operation.
    pub fn attempt(&self, op: &SyncOp) -> SyncResult<()> {
        debug!(action = op.action(), key = ?op.correlation_key(), "mirror attempt");
        match op {
            SyncOp::Insert { row } => {
                // The local surrogate id means nothing remotely.
                let mut row = row.clone();
                if let Some(map) = row.as_object_mut() {
                    map.remove("id");
                }
                self.remote.insert(&row)
            }
            SyncOp::Update { created_at, patch } => self
                .remote
                .update(&Filter::new().eq("created_at", created_at.clone()), patch),
            SyncOp::Delete { created_at } => self
                .remote
                .delete(&Filter::new().eq("created_at", created_at.clone())),
            SyncOp::Exit {
                plate,
                name,
                exit_at,
                extra,
            } => {
                // Best-effort heuristic: match by plate when present, else
                // by name, constrained to rows still marked on-site. All
                // matching rows are updated.
                let filter = if let Some(plate) = plate {
                    Filter::new().is_null("exit_at").eq("plate", plate.clone())
                } else if let Some(name) = name {
                    Filter::new().is_null("exit_at").eq("name", name.clone())
                } else {
                    // Nothing to match on; retrying cannot help, so the
                    // entry is treated as delivered.
                    warn!("exit op has neither plate nor name, skipping");
                    return Ok(());
                };

                let mut patch = extra.clone();
                if !patch.is_object() {
                    patch = Value::Object(Default::default());
                }
                if let Some(map) = patch.as_object_mut() {
                    map.insert("exit_at".into(), Value::String(exit_at.clone()));
                }
                self.remote.update(&filter, &patch)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockRemoteTable;
    use serde_json::json;

    fn client() -> MirrorClient<MockRemoteTable> {
        MirrorClient::new(MockRemoteTable::new())
    }

    #[test]
    fn insert_strips_local_id() {
        let mirror = client();
        mirror
            .attempt(&SyncOp::Insert {
                row: json!({"id": 42, "plate": "34 ABC", "created_at": "t1"}),
            })
            .unwrap();

        let rows = mirror.remote().rows();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].get("id").is_none());
        assert_eq!(rows[0]["plate"], "34 ABC");
    }

    #[test]
    fn update_and_delete_match_by_created_at() {
        let mirror = client();
        mirror
            .attempt(&SyncOp::Insert {
                row: json!({"created_at": "t1", "note": null}),
            })
            .unwrap();
        mirror
            .attempt(&SyncOp::Insert {
                row: json!({"created_at": "t2", "note": null}),
            })
            .unwrap();

        mirror
            .attempt(&SyncOp::Update {
                created_at: "t1".into(),
                patch: json!({"note": "changed"}),
            })
            .unwrap();
        let rows = mirror.remote().rows();
        assert_eq!(rows[0]["note"], "changed");
        assert!(rows[1]["note"].is_null());

        mirror
            .attempt(&SyncOp::Delete {
                created_at: "t2".into(),
            })
            .unwrap();
        assert_eq!(mirror.remote().rows().len(), 1);
    }

    #[test]
    fn exit_prefers_plate_and_updates_all_active_matches() {
        let mirror = client();
        // Two active rows with the same plate, one already exited.
        for (created, exit) in [("t1", Value::Null), ("t2", Value::Null), ("t3", json!("done"))] {
            mirror
                .attempt(&SyncOp::Insert {
                    row: json!({"created_at": created, "plate": "34 ABC", "name": "D", "exit_at": exit}),
                })
                .unwrap();
        }

        mirror
            .attempt(&SyncOp::Exit {
                plate: Some("34 ABC".into()),
                name: Some("D".into()),
                exit_at: "now".into(),
                extra: json!({"seal_number_exit": "S9"}),
            })
            .unwrap();

        let rows = mirror.remote().rows();
        assert_eq!(rows[0]["exit_at"], "now");
        assert_eq!(rows[0]["seal_number_exit"], "S9");
        assert_eq!(rows[1]["exit_at"], "now");
        // The already-exited row keeps its original exit stamp.
        assert_eq!(rows[2]["exit_at"], "done");
    }

    #[test]
    fn exit_falls_back_to_name() {
        let mirror = client();
        mirror
            .attempt(&SyncOp::Insert {
                row: json!({"created_at": "t1", "plate": null, "name": "Jane", "exit_at": null}),
            })
            .unwrap();

        mirror
            .attempt(&SyncOp::Exit {
                plate: None,
                name: Some("Jane".into()),
                exit_at: "now".into(),
                extra: json!({}),
            })
            .unwrap();

        assert_eq!(mirror.remote().rows()[0]["exit_at"], "now");
    }

    #[test]
    fn unmatchable_exit_is_dropped_without_remote_call() {
        let mirror = client();
        mirror
            .attempt(&SyncOp::Exit {
                plate: None,
                name: None,
                exit_at: "now".into(),
                extra: json!({}),
            })
            .unwrap();
        assert_eq!(mirror.remote().call_count(), 0);
    }
}
