//! In-memory encoding containers and value encoding.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value as Json};

use super::error::{CodingPath, EncodingError, EvalError, child_path, index_key};
use super::interp::{Frame, Interp, Slot};
use super::value::Value;
use super::Evaluator;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct NodeId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Container {
    /// Encoder handed out by `superEncoder()`; the callee picks the shape.
    Pending,
    Keyed,
    Unkeyed,
}

#[derive(Debug)]
enum Node {
    Pending,
    Keyed(IndexMap<String, NodeId>),
    Unkeyed(Vec<NodeId>),
    Leaf(Json),
}

impl From<Container> for Node {
    fn from(container: Container) -> Self {
        match container {
            Container::Pending => Node::Pending,
            Container::Keyed => Node::Keyed(IndexMap::new()),
            Container::Unkeyed => Node::Unkeyed(Vec::new()),
        }
    }
}

/// Containers opened while encoding one top-level value.
#[derive(Debug)]
pub(super) struct EncodingTree {
    nodes: Vec<Node>,
    paths: Vec<CodingPath>,
}

impl EncodingTree {
    pub(super) const ROOT: NodeId = NodeId(0);

    pub(super) fn new(path: CodingPath) -> Self {
        Self {
            nodes: vec![Node::Pending],
            paths: vec![path],
        }
    }

    pub(super) fn path(&self, node: NodeId) -> &CodingPath {
        &self.paths[node.0]
    }

    fn alloc(&mut self, node: Node, path: CodingPath) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.paths.push(path);
        id
    }

    /// `encoder.container(keyedBy:)`. Asking twice yields the same container.
    pub(super) fn keyed(&mut self, node: NodeId) -> Result<(), EvalError> {
        if matches!(self.nodes[node.0], Node::Pending) {
            self.nodes[node.0] = Node::Keyed(IndexMap::new());
        }
        if matches!(self.nodes[node.0], Node::Keyed(_)) {
            Ok(())
        } else {
            Err(EvalError::unsupported(format!(
                "encoder at {:?} already holds a non-keyed value",
                self.paths[node.0]
            )))
        }
    }

    fn insert(&mut self, parent: NodeId, key: &str, node: Node) -> Result<NodeId, EvalError> {
        if !matches!(self.nodes[parent.0], Node::Keyed(_)) {
            return Err(EvalError::unsupported(format!(
                "cannot encode key '{key}' outside a keyed container"
            )));
        }
        let id = self.alloc(node, child_path(&self.paths[parent.0], key));
        if let Node::Keyed(entries) = &mut self.nodes[parent.0] {
            entries.insert(key.to_string(), id);
        }
        Ok(id)
    }

    pub(super) fn insert_leaf(&mut self, parent: NodeId, key: &str, json: Json) -> Result<(), EvalError> {
        self.insert(parent, key, Node::Leaf(json)).map(|_| ())
    }

    pub(super) fn insert_container(
        &mut self,
        parent: NodeId,
        key: &str,
        container: Container,
    ) -> Result<NodeId, EvalError> {
        self.insert(parent, key, container.into())
    }

    pub(super) fn unkeyed_len(&self, node: NodeId) -> Result<usize, EvalError> {
        match &self.nodes[node.0] {
            Node::Unkeyed(items) => Ok(items.len()),
            _ => Err(EvalError::unsupported(
                "cannot append outside an unkeyed container",
            )),
        }
    }

    pub(super) fn push_leaf(&mut self, parent: NodeId, json: Json) -> Result<(), EvalError> {
        let index = self.unkeyed_len(parent)?;
        let id = self.alloc(
            Node::Leaf(json),
            child_path(&self.paths[parent.0], &index_key(index)),
        );
        if let Node::Unkeyed(items) = &mut self.nodes[parent.0] {
            items.push(id);
        }
        Ok(())
    }

    pub(super) fn into_json(self) -> Json {
        self.build(Self::ROOT)
    }

    fn build(&self, node: NodeId) -> Json {
        match &self.nodes[node.0] {
            // Nothing was encoded through this encoder.
            Node::Pending => Json::Object(Map::new()),
            Node::Keyed(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(key, child)| (key.clone(), self.build(*child)))
                    .collect(),
            ),
            Node::Unkeyed(items) => Json::Array(items.iter().map(|item| self.build(*item)).collect()),
            Node::Leaf(json) => json.clone(),
        }
    }
}

impl Evaluator<'_> {
    pub(super) fn encode_value(&self, value: &Value, path: &[String]) -> Result<Json, EvalError> {
        match value {
            Value::Nil => Ok(Json::Null),
            Value::Bool(flag) => Ok(Json::Bool(*flag)),
            Value::Int(number) => Ok(Json::from(*number)),
            Value::Double(number) => Number::from_f64(*number).map(Json::Number).ok_or_else(|| {
                EncodingError::InvalidValue {
                    ty: "Double".into(),
                    path: path.to_vec(),
                    description: format!("Unable to encode Double.{number} directly in JSON."),
                }
                .into()
            }),
            Value::String(text) => Ok(Json::String(text.clone())),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| self.encode_value(item, &child_path(path, &index_key(index))))
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
            Value::Dictionary(entries) => entries
                .iter()
                .map(|(key, item)| Ok((key.clone(), self.encode_value(item, &child_path(path, key))?)))
                .collect::<Result<Map<_, _>, EvalError>>()
                .map(Json::Object),
            Value::Object { ty, .. } | Value::Case { ty, .. } => {
                let decl = self.arena.resolve_ty_decl(ty).ok_or_else(|| {
                    EvalError::unsupported(format!(
                        "'{}' does not name a nominal type",
                        self.arena.type_name(ty)
                    ))
                })?;
                let witness =
                    self.witness(decl, self.arena.generic_bindings(ty), "encode", "to")?;
                let mut this = value.clone();
                let mut interp = Interp::new(self, path.to_vec());
                let mut frame = Frame::new(
                    witness.owner,
                    witness.bindings,
                    ty.clone(),
                    &mut this,
                    "encoder",
                    Slot::Encoder(EncodingTree::ROOT),
                );
                interp.run_block(witness.body, &mut frame)?;
                Ok(interp.into_json())
            }
        }
    }
}
