use std::collections::{BTreeMap, BTreeSet};

use rotaplan_core::{DocId, FieldValue, ItemId, OrderedItem, FIELD_ACTIVE, FIELD_ORDER};
use rotaplan_store::WriteOp;

/// Output of the pure planning phase: the write set for one bucket and the
/// renormalized item list that becomes `original` once the batch lands.
#[derive(Debug)]
pub struct CommitPlan {
    pub ops: Vec<WriteOp>,
    pub committed: Vec<OrderedItem>,
}

impl CommitPlan {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Diff `draft` against `original` into an atomic write set.
///
/// Deletions are ids present in `original` and absent from `draft`. Every
/// draft item gets `order := index` in place. Local identities are resolved
/// through `allocate` and rewritten in place, so references taken before the
/// commit stay valid after it; identity status is read here, at commit
/// start, never from an earlier plan. Store-backed items produce a merge
/// only when they differ from their `original` counterpart, which keeps a
/// pristine draft from issuing any write at all.
pub fn plan_commit(
    original: &[OrderedItem],
    draft: &mut [OrderedItem],
    mut allocate: impl FnMut() -> DocId,
) -> CommitPlan {
    let draft_ids: BTreeSet<ItemId> = draft.iter().map(|item| item.id).collect();
    let mut ops = Vec::new();

    for item in original {
        if !draft_ids.contains(&item.id) {
            // Items that only ever lived in the draft cannot appear here:
            // original holds store-backed state exclusively.
            if let Some(doc_id) = item.id.as_doc() {
                ops.push(WriteOp::Delete { id: doc_id });
            }
        }
    }

    for (index, item) in draft.iter_mut().enumerate() {
        item.order = index as i64;
        match item.id {
            ItemId::Local(_) => {
                let doc_id = allocate();
                item.id = ItemId::Doc(doc_id);
                ops.push(WriteOp::Create {
                    id: doc_id,
                    fields: encode_item(item),
                });
            }
            ItemId::Doc(doc_id) => {
                let unchanged = original.iter().any(|o| o.id == item.id && o == &*item);
                if !unchanged {
                    ops.push(WriteOp::Merge {
                        id: doc_id,
                        fields: encode_item(item),
                    });
                }
            }
        }
    }

    CommitPlan {
        ops,
        committed: draft.to_vec(),
    }
}

/// Flatten an item into its document field bag, folding the reserved
/// `order`/`active` fields back in.
fn encode_item(item: &OrderedItem) -> BTreeMap<String, FieldValue> {
    let mut fields = item.fields.clone();
    fields.insert(FIELD_ORDER.to_string(), FieldValue::Integer(item.order));
    fields.insert(FIELD_ACTIVE.to_string(), FieldValue::Boolean(item.active));
    fields
}
