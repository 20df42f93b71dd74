//! # Ontology Graph Export
//!
//! Builds a directed graph from docset documents. Each entity a document
//! carries becomes a node holding the entity's scalar fields; each registry
//! relation whose target entity is carried by the same document becomes an
//! edge labelled with the relation name.
//!
//! Entities with identifying keys (see [`DocsetConfig::node_keys`]) are
//! keyed by content, so one patient's invoice and consent meet at the same
//! Patient and Encounter nodes. Other entities, and keyed entities whose key
//! fields are missing, get one node per document. A repeated edge between
//! the same pair is updated in place.
//!
//! The graph is written as GEXF 1.3.

use std::collections::HashMap;
use std::path::Path;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use serde_json::Value;

use cald_core::{EntitySpec, RegistrySpec};
use cald_schema::{extract, SchemaError};

use crate::docsets::{create_parent, display_path, read_document, DocsetConfig};
use crate::error::ReportError;

/// Default location of the GEXF export.
pub const DEFAULT_GRAPH_PATH: &str = "output/reports/ontology_graph.gexf";

const GEXF_NS: &str = "http://www.gexf.net/1.3";

/// One entity projection of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityNode {
    /// `<entity>:<key values>` or `<entity>:<document path>`.
    pub id: String,
    /// Entity name.
    pub entity: String,
    /// Scalar fields in declaration order; null renders as `""`.
    pub attributes: Vec<(String, String)>,
}

/// Entity nodes joined by relation-name edges.
pub type OntologyGraph = DiGraph<EntityNode, String>;

/// Build the graph from every docset document under `root`.
pub fn build_graph(
    registry: &RegistrySpec,
    root: &Path,
    config: &DocsetConfig,
) -> Result<OntologyGraph, ReportError> {
    config.check_against(registry)?;

    let mut graph = OntologyGraph::new();
    let mut node_index_map: HashMap<String, NodeIndex> = HashMap::new();

    for docset in &config.docsets {
        for path in docset.files(root)? {
            let document = match read_document(&path) {
                Ok(document) => document,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping document");
                    continue;
                }
            };
            let scope = display_path(root, &path.with_extension(""));

            let mut carried: Vec<(&EntitySpec, NodeIndex)> = Vec::new();
            for entity_name in &docset.entities {
                let entity = registry
                    .entity(entity_name)
                    .ok_or_else(|| SchemaError::UnknownEntity(entity_name.clone()))?;
                let projected = extract(&document, entity_name, registry)?;
                let node = EntityNode {
                    id: node_id(entity_name, config.keys_for(entity_name), &document, &scope),
                    entity: entity_name.clone(),
                    attributes: scalar_attributes(entity, &projected),
                };

                let idx = match node_index_map.get(&node.id) {
                    Some(&idx) => {
                        merge_attributes(&mut graph[idx], node.attributes);
                        idx
                    }
                    None => {
                        let id = node.id.clone();
                        let idx = graph.add_node(node);
                        node_index_map.insert(id, idx);
                        idx
                    }
                };
                carried.push((entity, idx));
            }

            for (entity, from) in &carried {
                for relation in &entity.relations {
                    if let Some((_, to)) = carried.iter().find(|(e, _)| e.name == relation.target)
                    {
                        graph.update_edge(*from, *to, relation.name.clone());
                    }
                }
            }
        }
    }

    tracing::info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "ontology graph built"
    );
    Ok(graph)
}

/// Node id of one entity projection.
///
/// With identifying keys that are all present and non-blank the id is
/// `<entity>:<key>:<key>...`, shared by every document describing the same
/// instance. Otherwise it is `<entity>:<document path without extension>`.
fn node_id(entity: &str, keys: &[String], document: &Value, scope: &str) -> String {
    let prefix = entity.to_lowercase();
    let parts: Option<Vec<String>> = if keys.is_empty() {
        None
    } else {
        keys.iter()
            .map(|key| document.get(key).and_then(key_part))
            .collect()
    };
    match parts {
        Some(parts) => format!("{prefix}:{}", parts.join(":")),
        None => format!("{prefix}:{scope}"),
    }
}

fn key_part(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    Some(text.to_lowercase().replace(' ', "_"))
}

/// Fill blank attributes of `node` from a later projection of the same
/// instance. Values already present are kept.
fn merge_attributes(node: &mut EntityNode, attributes: Vec<(String, String)>) {
    for (name, value) in attributes {
        match node.attributes.iter().position(|(n, _)| *n == name) {
            Some(i) if node.attributes[i].1.is_empty() => node.attributes[i].1 = value,
            Some(_) => {}
            None => node.attributes.push((name, value)),
        }
    }
}

fn scalar_attributes(entity: &EntitySpec, projected: &Value) -> Vec<(String, String)> {
    entity
        .fields
        .iter()
        .filter(|f| !f.field_type.is_array())
        .map(|f| {
            let value = match projected.get(&f.name) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            (f.name.clone(), value)
        })
        .collect()
}

/// Render `graph` as a GEXF 1.3 document.
pub fn render_gexf(graph: &OntologyGraph) -> Result<String, ReportError> {
    // Node attribute columns: the entity type, then every field name in
    // first-seen order.
    let mut titles: Vec<&str> = vec!["type"];
    for node in graph.node_weights() {
        for (name, _) in &node.attributes {
            if !titles.contains(&name.as_str()) {
                titles.push(name);
            }
        }
    }
    let column = |title: &str| {
        titles
            .iter()
            .position(|t| *t == title)
            .unwrap_or_default()
            .to_string()
    };

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    emit(
        &mut writer,
        Event::Start(
            BytesStart::new("gexf").with_attributes([("xmlns", GEXF_NS), ("version", "1.3")]),
        ),
    )?;
    emit(
        &mut writer,
        Event::Start(
            BytesStart::new("graph")
                .with_attributes([("defaultedgetype", "directed"), ("mode", "static")]),
        ),
    )?;

    emit(
        &mut writer,
        Event::Start(
            BytesStart::new("attributes").with_attributes([("class", "node"), ("mode", "static")]),
        ),
    )?;
    for (i, title) in titles.iter().enumerate() {
        let id = i.to_string();
        emit(
            &mut writer,
            Event::Empty(BytesStart::new("attribute").with_attributes([
                ("id", id.as_str()),
                ("title", *title),
                ("type", "string"),
            ])),
        )?;
    }
    emit(&mut writer, Event::End(BytesEnd::new("attributes")))?;

    emit(
        &mut writer,
        Event::Start(
            BytesStart::new("attributes").with_attributes([("class", "edge"), ("mode", "static")]),
        ),
    )?;
    emit(
        &mut writer,
        Event::Empty(BytesStart::new("attribute").with_attributes([
            ("id", "0"),
            ("title", "relation"),
            ("type", "string"),
        ])),
    )?;
    emit(&mut writer, Event::End(BytesEnd::new("attributes")))?;

    emit(&mut writer, Event::Start(BytesStart::new("nodes")))?;
    for node in graph.node_weights() {
        emit(
            &mut writer,
            Event::Start(
                BytesStart::new("node")
                    .with_attributes([("id", node.id.as_str()), ("label", node.id.as_str())]),
            ),
        )?;
        emit(&mut writer, Event::Start(BytesStart::new("attvalues")))?;
        let type_column = column("type");
        emit(
            &mut writer,
            Event::Empty(BytesStart::new("attvalue").with_attributes([
                ("for", type_column.as_str()),
                ("value", node.entity.as_str()),
            ])),
        )?;
        for (name, value) in &node.attributes {
            let for_column = column(name);
            emit(
                &mut writer,
                Event::Empty(BytesStart::new("attvalue").with_attributes([
                    ("for", for_column.as_str()),
                    ("value", value.as_str()),
                ])),
            )?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("attvalues")))?;
        emit(&mut writer, Event::End(BytesEnd::new("node")))?;
    }
    emit(&mut writer, Event::End(BytesEnd::new("nodes")))?;

    emit(&mut writer, Event::Start(BytesStart::new("edges")))?;
    for edge in graph.edge_references() {
        let id = edge.id().index().to_string();
        emit(
            &mut writer,
            Event::Start(BytesStart::new("edge").with_attributes([
                ("id", id.as_str()),
                ("source", graph[edge.source()].id.as_str()),
                ("target", graph[edge.target()].id.as_str()),
                ("label", edge.weight().as_str()),
            ])),
        )?;
        emit(&mut writer, Event::Start(BytesStart::new("attvalues")))?;
        emit(
            &mut writer,
            Event::Empty(
                BytesStart::new("attvalue")
                    .with_attributes([("for", "0"), ("value", edge.weight().as_str())]),
            ),
        )?;
        emit(&mut writer, Event::End(BytesEnd::new("attvalues")))?;
        emit(&mut writer, Event::End(BytesEnd::new("edge")))?;
    }
    emit(&mut writer, Event::End(BytesEnd::new("edges")))?;

    emit(&mut writer, Event::End(BytesEnd::new("graph")))?;
    emit(&mut writer, Event::End(BytesEnd::new("gexf")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| ReportError::Xml(e.to_string()))
}

/// Write `graph` as GEXF to `path`, creating parent directories.
pub fn write_gexf(graph: &OntologyGraph, path: &Path) -> Result<(), ReportError> {
    create_parent(path)?;
    let mut xml = render_gexf(graph)?;
    xml.push('\n');
    std::fs::write(path, xml).map_err(|e| ReportError::io(path, e))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ReportError> {
    writer
        .write_event(event)
        .map_err(|e| ReportError::Xml(e.to_string()))
}
