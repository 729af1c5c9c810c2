//! Encoding of content subtrees into version blobs.
//!
//! A blob is a JSON envelope `{"format": N, "nodes": [...]}`. Nodes are
//! written flat in depth-first order, each child naming the position of its
//! parent, so decoding depth does not grow with tree depth. Nodes are strict:
//! fields this build does not know about fail the decode instead of being
//! dropped. Detail values carry their type tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ErrorCode, FolioError, FolioResult};
use crate::types::{ContentItem, ContentState, DetailCollection, DetailValue, ItemId};

/// Blob format written by this build. Blobs with a greater format are
/// rejected.
pub const BLOB_FORMAT: u32 = 1;

#[derive(Deserialize)]
struct FormatProbe {
    format: u32,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    format: u32,
    nodes: Vec<SerializedNode>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SerializedNode {
    /// Position of the parent node in the envelope, absent for the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    under: Option<usize>,
    id: Option<ItemId>,
    version_of: Option<ItemId>,
    parent: Option<ItemId>,
    item_type: String,
    title: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    zone_name: Option<String>,
    sort_order: i32,
    visible: bool,
    state: ContentState,
    version_index: i32,
    #[serde(default)]
    saved_by: Option<String>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    #[serde(default)]
    published: Option<DateTime<Utc>>,
    #[serde(default)]
    expires: Option<DateTime<Utc>>,
    #[serde(default)]
    details: BTreeMap<String, DetailValue>,
    #[serde(default)]
    collections: BTreeMap<String, Vec<DetailValue>>,
}

impl SerializedNode {
    fn from_item(item: &ContentItem, under: Option<usize>) -> FolioResult<Self> {
        for (name, value) in &item.details {
            if name.is_empty() {
                return Err(FolioError::unsupported_value(format!(
                    "item '{}' has a detail with an empty name",
                    item.title
                )));
            }
            check_value(item, name, value)?;
        }

        let mut collections = BTreeMap::new();
        for (name, collection) in &item.detail_collections {
            if name.is_empty() {
                return Err(FolioError::unsupported_value(format!(
                    "item '{}' has a detail collection with an empty name",
                    item.title
                )));
            }
            for value in collection {
                check_value(item, name, value)?;
            }
            collections.insert(name.clone(), collection.iter().cloned().collect());
        }

        Ok(Self {
            under,
            id: item.id,
            version_of: item.version_of,
            parent: item.parent,
            item_type: item.item_type.clone(),
            title: item.title.clone(),
            name: item.name.clone(),
            zone_name: item.zone_name.clone(),
            sort_order: item.sort_order,
            visible: item.visible,
            state: item.state,
            version_index: item.version_index,
            saved_by: item.saved_by.clone(),
            created: item.created,
            updated: item.updated,
            published: item.published,
            expires: item.expires,
            details: item.details.clone(),
            collections,
        })
    }

    fn into_item(self) -> ContentItem {
        ContentItem {
            id: self.id,
            item_type: self.item_type,
            title: self.title,
            name: self.name,
            parent: self.parent,
            zone_name: self.zone_name,
            sort_order: self.sort_order,
            visible: self.visible,
            state: self.state,
            version_index: self.version_index,
            version_of: self.version_of,
            saved_by: self.saved_by,
            created: self.created,
            updated: self.updated,
            published: self.published,
            expires: self.expires,
            details: self.details,
            detail_collections: self
                .collections
                .into_iter()
                .map(|(name, values)| (name, values.into_iter().collect::<DetailCollection>()))
                .collect(),
            children: Vec::new(),
        }
    }
}

fn check_value(item: &ContentItem, name: &str, value: &DetailValue) -> FolioResult<()> {
    let problem = match value {
        DetailValue::Double(d) if !d.is_finite() => Some("a non-finite number"),
        DetailValue::Link(id) if id.0 <= 0 => Some("a link to an unsaved item"),
        DetailValue::Json(serde_json::Value::Null) => Some("a null value"),
        _ => None,
    };
    match problem {
        Some(problem) => Err(FolioError::unsupported_value(format!(
            "detail '{}' on item '{}' holds {}",
            name, item.title, problem
        ))),
        None => Ok(()),
    }
}

/// Flatten a subtree depth first, parents before children, siblings in order.
fn flatten(root: &ContentItem) -> FolioResult<Vec<SerializedNode>> {
    let mut nodes = Vec::new();
    let mut stack = vec![(root, None)];
    while let Some((item, under)) = stack.pop() {
        let position = nodes.len();
        nodes.push(SerializedNode::from_item(item, under)?);
        stack.extend(item.children.iter().rev().map(|child| (child, Some(position))));
    }
    Ok(nodes)
}

/// Rebuild the tree from flat nodes. Every node but the first must name an
/// earlier node as its parent.
fn assemble(nodes: Vec<SerializedNode>) -> FolioResult<ContentItem> {
    if nodes.is_empty() {
        return Err(FolioError::deserialization("blob holds no nodes"));
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (position, node) in nodes.iter().enumerate() {
        match (position, node.under) {
            (0, None) => {}
            (0, Some(_)) => {
                return Err(FolioError::deserialization("root node names a parent node"));
            }
            (_, Some(under)) if under < position => children[under].push(position),
            (_, _) => {
                return Err(FolioError::deserialization(format!(
                    "node {} does not name an earlier parent node",
                    position
                )));
            }
        }
    }

    let mut slots: Vec<Option<ContentItem>> =
        nodes.into_iter().map(|node| Some(node.into_item())).collect();

    // Children always sit after their parent, so walking backwards finishes
    // every child before its parent takes it.
    for position in (0..slots.len()).rev() {
        let kids = children[position]
            .iter()
            .map(|&child| slots[child].take())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| FolioError::Internal("child node taken twice".to_string()))?;
        if let Some(item) = slots[position].as_mut() {
            item.children = kids;
        }
    }

    slots[0]
        .take()
        .ok_or_else(|| FolioError::Internal("root node missing after assembly".to_string()))
}

/// Converts content subtrees to version blobs and back.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemSerializer {
    pretty: bool,
}

impl ItemSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty-print written blobs.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Encode `root` and every descendant into a blob.
    pub fn serialize(&self, root: &ContentItem) -> FolioResult<String> {
        let envelope = Envelope {
            format: BLOB_FORMAT,
            nodes: flatten(root)?,
        };
        let encoded = if self.pretty {
            serde_json::to_string_pretty(&envelope)
        } else {
            serde_json::to_string(&envelope)
        };
        encoded.map_err(|e| FolioError::Serialization {
            message: e.to_string(),
            code: ErrorCode::SerEncodingFailed,
            source: Some(Box::new(e)),
        })
    }

    /// Decode a blob into a freestanding item tree.
    pub fn deserialize(&self, blob: &str) -> FolioResult<ContentItem> {
        let probe: FormatProbe = serde_json::from_str(blob)?;
        if probe.format == 0 || probe.format > BLOB_FORMAT {
            return Err(FolioError::Deserialization {
                message: format!(
                    "blob format {} is not supported (newest known format is {})",
                    probe.format, BLOB_FORMAT
                ),
                code: ErrorCode::DesUnsupportedFormat,
                source: None,
            });
        }

        let envelope: Envelope = serde_json::from_str(blob)?;
        assemble(envelope.nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> ContentItem {
        let mut page = ContentItem::new("page").with_type("NormalPage").with_name("page");
        page.id = Some(ItemId(1));
        page.version_index = 3;
        page.state = ContentState::Published;
        page.saved_by = Some("admin".to_string());
        page.published = Some(Utc::now());
        page.set_detail("Hello", "world");
        page.set_detail("Count", 42i64);
        page.set_detail("Ratio", 0.5);
        page.detail_collection_mut("Stuffs").add("Hello");
        page.detail_collection_mut("Stuffs").add(ItemId(5));

        let mut part = ContentItem::new("part").with_zone("TheZone");
        part.id = Some(ItemId(2));
        part.set_detail("Hello", "part world");
        page.add_child(part);
        page.add_child(ContentItem::new("second part").with_zone("TheZone").with_sort_order(1));
        page
    }

    #[test]
    fn test_round_trip_preserves_tree() {
        let serializer = ItemSerializer::new();
        let page = sample_tree();

        let blob = serializer.serialize(&page).unwrap();
        let restored = serializer.deserialize(&blob).unwrap();

        assert_eq!(restored, page);
        assert_eq!(restored.children.len(), 2);
        assert_eq!(restored.children[0].title, "part");
        assert_eq!(restored.children[1].title, "second part");
        assert_eq!(restored.children[0].parent, Some(ItemId(1)));
    }

    #[test]
    fn test_blob_is_deterministic() {
        let serializer = ItemSerializer::new();
        let page = sample_tree();
        assert_eq!(
            serializer.serialize(&page).unwrap(),
            serializer.serialize(&page.clone()).unwrap()
        );
    }

    #[test]
    fn test_pretty_blob_decodes() {
        let serializer = ItemSerializer::new().pretty(true);
        let blob = serializer.serialize(&sample_tree()).unwrap();
        assert!(blob.contains('\n'));
        assert_eq!(serializer.deserialize(&blob).unwrap().title, "page");
    }

    #[test]
    fn test_non_finite_double_fails() {
        let mut page = sample_tree();
        page.children[0].set_detail("Broken", f64::NAN);

        let err = ItemSerializer::new().serialize(&page).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SerUnsupportedValue);
        assert!(err.to_string().contains("Broken"));
    }

    #[test]
    fn test_link_to_unsaved_item_fails() {
        let mut page = sample_tree();
        page.detail_collection_mut("Links").add(ItemId(0));

        let err = ItemSerializer::new().serialize(&page).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SerUnsupportedValue);
    }

    #[test]
    fn test_unknown_node_field_fails() {
        let serializer = ItemSerializer::new();
        let blob = serializer.serialize(&sample_tree()).unwrap();
        let mut json: serde_json::Value = serde_json::from_str(&blob).unwrap();
        json["nodes"][1]["layout"] = serde_json::json!("grid");

        let err = serializer.deserialize(&json.to_string()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DesMalformedBlob);
    }

    #[test]
    fn test_unknown_detail_type_fails() {
        let serializer = ItemSerializer::new();
        let blob = serializer.serialize(&sample_tree()).unwrap();
        let mut json: serde_json::Value = serde_json::from_str(&blob).unwrap();
        json["nodes"][0]["details"]["Hello"] = serde_json::json!({"type": "money", "value": 5});

        assert!(serializer.deserialize(&json.to_string()).is_err());
    }

    #[test]
    fn test_future_format_fails() {
        let serializer = ItemSerializer::new();
        let blob = serializer.serialize(&sample_tree()).unwrap();
        let mut json: serde_json::Value = serde_json::from_str(&blob).unwrap();
        json["format"] = serde_json::json!(BLOB_FORMAT + 1);

        let err = serializer.deserialize(&json.to_string()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DesUnsupportedFormat);
    }

    #[test]
    fn test_garbage_fails() {
        let err = ItemSerializer::new().deserialize("<item/>").unwrap_err();
        assert_eq!(err.code(), ErrorCode::DesMalformedBlob);
    }

    #[test]
    fn test_doubles_round_trip_exactly() {
        let serializer = ItemSerializer::new();
        let values = [
            989.9951327998887,
            0.1 + 0.2,
            1.0 / 3.0,
            -2.2250738585072014e-308,
            5e-324,
            f64::MAX,
            123456.78901234567,
        ];

        let mut page = sample_tree();
        for (i, value) in values.iter().enumerate() {
            page.set_detail(format!("price{}", i), *value);
            page.detail_collection_mut("Prices").add(*value);
        }

        let restored = serializer.deserialize(&serializer.serialize(&page).unwrap()).unwrap();
        for (i, value) in values.iter().enumerate() {
            assert_eq!(
                restored[format!("price{}", i).as_str()],
                DetailValue::Double(*value)
            );
        }
        assert_eq!(restored, page);
    }

    #[test]
    fn test_deep_tree_round_trips() {
        let depth = 300;
        let mut node = ContentItem::new(format!("level {}", depth));
        for level in (0..depth).rev() {
            let mut parent = ContentItem::new(format!("level {}", level));
            parent.add_child(node);
            node = parent;
        }

        let serializer = ItemSerializer::new();
        let restored = serializer.deserialize(&serializer.serialize(&node).unwrap()).unwrap();

        assert_eq!(restored.subtree_len(), depth + 1);
        let deepest = restored.descendants().last().unwrap();
        assert_eq!(deepest.title, format!("level {}", depth));
    }

    #[test]
    fn test_sibling_order_survives_flattening() {
        let mut page = ContentItem::new("page");
        let mut left = ContentItem::new("left");
        left.add_child(ContentItem::new("left child"));
        page.add_child(left);
        page.add_child(ContentItem::new("middle"));
        page.add_child(ContentItem::new("right"));

        let serializer = ItemSerializer::new();
        let restored = serializer.deserialize(&serializer.serialize(&page).unwrap()).unwrap();
        let titles: Vec<_> = restored.descendants().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["page", "left", "left child", "middle", "right"]);
    }

    #[test]
    fn test_empty_detail_name_fails() {
        let mut page = sample_tree();
        page.set_detail("", "nameless");

        let err = ItemSerializer::new().serialize(&page).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SerUnsupportedValue);
    }

    #[test]
    fn test_empty_collection_name_fails() {
        let mut page = sample_tree();
        page.children[0].detail_collection_mut("").add("nameless");

        let err = ItemSerializer::new().serialize(&page).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SerUnsupportedValue);
    }

    #[test]
    fn test_null_json_detail_fails() {
        let mut page = sample_tree();
        page.set_detail("Extra", DetailValue::Json(serde_json::Value::Null));

        let err = ItemSerializer::new().serialize(&page).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SerUnsupportedValue);

        page.set_detail("Extra", DetailValue::Json(serde_json::json!({"a": 1})));
        assert!(ItemSerializer::new().serialize(&page).is_ok());
    }

    #[test]
    fn test_forward_parent_reference_fails() {
        let serializer = ItemSerializer::new();
        let blob = serializer.serialize(&sample_tree()).unwrap();
        let mut json: serde_json::Value = serde_json::from_str(&blob).unwrap();
        json["nodes"][1]["under"] = serde_json::json!(2);

        let err = serializer.deserialize(&json.to_string()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DesMalformedBlob);

        json["nodes"] = serde_json::json!([]);
        let err = serializer.deserialize(&json.to_string()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DesMalformedBlob);
    }
}
