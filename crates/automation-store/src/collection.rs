//! Upsert and delete over a list of raw items

use serde_json::Value;

use crate::Item;

/// What an upsert did to the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No item had the ID; the new item was appended
    Created,
    /// The item with the same ID was replaced in place
    Updated,
}

/// ID of a raw item
///
/// Hand-edited files sometimes carry unquoted numeric IDs; those compare by
/// their text form.
pub fn item_id(item: &Item) -> Option<String> {
    match item.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn has_id(item: &Item, id: &str) -> bool {
    item_id(item).as_deref() == Some(id)
}

/// Replace the item with the same ID in place, or append it
///
/// Items without a matching ID are left untouched. If the collection somehow
/// holds several items with the ID, only the first is replaced and the
/// duplicates are dropped so the ID becomes unique again.
pub fn upsert(items: &mut Vec<Item>, item: Item) -> UpsertOutcome {
    let Some(id) = item_id(&item) else {
        items.push(item);
        return UpsertOutcome::Created;
    };

    match items.iter().position(|it| has_id(it, &id)) {
        Some(index) => {
            items[index] = item;
            let mut position = 0;
            items.retain(|it| {
                let keep = position <= index || !has_id(it, &id);
                position += 1;
                keep
            });
            UpsertOutcome::Updated
        }
        None => {
            items.push(item);
            UpsertOutcome::Created
        }
    }
}

/// Remove every item with the ID; returns whether anything was removed
pub fn remove(items: &mut Vec<Item>, id: &str) -> bool {
    let before = items.len();
    items.retain(|it| !has_id(it, id));
    items.len() != before
}

/// Find the item with the ID
pub fn find<'a>(items: &'a [Item], id: &str) -> Option<&'a Item> {
    items.iter().find(|it| has_id(it, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(items: &[Item]) -> Vec<String> {
        items.iter().filter_map(item_id).collect()
    }

    #[test]
    fn test_upsert_new_id_appends() {
        let mut items = vec![json!({"id": "a"}), json!({"id": "b"})];
        let outcome = upsert(&mut items, json!({"id": "c", "alias": "C"}));
        assert_eq!(outcome, UpsertOutcome::Created);
        assert_eq!(ids(&items), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_upsert_existing_id_replaces_in_place() {
        let mut items = vec![
            json!({"id": "a", "alias": "A", "extra": true}),
            json!({"id": "b", "alias": "B"}),
            json!({"id": "c", "alias": "C", "use_blueprint": {"path": "x.yaml"}}),
        ];
        let outcome = upsert(&mut items, json!({"id": "b", "alias": "B2"}));

        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(ids(&items), vec!["a", "b", "c"]);
        assert_eq!(items[1]["alias"], "B2");
        assert_eq!(items[0], json!({"id": "a", "alias": "A", "extra": true}));
        assert_eq!(
            items[2],
            json!({"id": "c", "alias": "C", "use_blueprint": {"path": "x.yaml"}})
        );
    }

    #[test]
    fn test_upsert_collapses_duplicates() {
        let mut items = vec![
            json!({"id": "a", "n": 1}),
            json!({"id": "b"}),
            json!({"id": "a", "n": 2}),
        ];
        upsert(&mut items, json!({"id": "a", "n": 3}));
        assert_eq!(ids(&items), vec!["a", "b"]);
        assert_eq!(items[0]["n"], 3);
    }

    #[test]
    fn test_numeric_ids_match_text() {
        let mut items = vec![json!({"id": 1700000000, "alias": "old"})];
        let outcome = upsert(&mut items, json!({"id": "1700000000", "alias": "new"}));
        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["alias"], "new");
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut items = vec![json!({"id": "a"}), json!({"alias": "no id"})];
        assert!(!remove(&mut items, "zzz"));
        assert_eq!(items.len(), 2);

        assert!(remove(&mut items, "a"));
        assert!(!remove(&mut items, "a"));
        assert_eq!(items, vec![json!({"alias": "no id"})]);
    }

    #[test]
    fn test_find() {
        let items = vec![json!({"id": "a"}), json!({"id": "b", "alias": "B"})];
        assert_eq!(find(&items, "b").map(|i| &i["alias"]), Some(&json!("B")));
        assert!(find(&items, "c").is_none());
    }
}
