//! Attributed transit network
//!
//! A directed or undirected simple graph whose nodes are stops/stations and
//! whose edges are transit links or inter-modal walking transfers.
//!
//! Nodes live in insertion-ordered slots. Removing a node empties its slot
//! but never renumbers the others, so a slot index stays valid in every
//! working copy cloned from the same network. The simulation engines rely
//! on this to share load and capacity maps between a base network and its
//! damaged copies.

use crate::error::{ResilienceError, Result};
use crate::GeoPoint;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet, VecDeque};

/// Stop or station identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transit subsystem a stop belongs to (metro, bus, ferry, railway, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitMode(pub String);

impl TransitMode {
    pub fn new(mode: impl Into<String>) -> Self {
        Self(mode.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Edge type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Link served by a transit line
    #[default]
    Line,
    /// Inter-modal walking transfer
    Walk,
}

/// Node attributes
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub id: NodeId,
    pub mode: Option<TransitMode>,
    pub name: Option<String>,
    pub position: Option<GeoPoint>,
}

impl NodeData {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(id),
            mode: None,
            name: None,
            position: None,
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(TransitMode::new(mode));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_position(mut self, position: GeoPoint) -> Self {
        self.position = Some(position);
        self
    }
}

/// Edge attributes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub kind: EdgeKind,
    /// Geodesic length in metres (1.0 when no geometry is known)
    pub length: f64,
}

impl EdgeData {
    pub fn new(kind: EdgeKind, length: f64) -> Self {
        Self { kind, length }
    }
}

#[derive(Debug, Clone)]
struct NodeSlot {
    data: NodeData,
    /// Out-neighbours (all neighbours for undirected networks)
    succ: BTreeMap<usize, EdgeData>,
    /// In-neighbours, only maintained for directed networks
    pred: BTreeSet<usize>,
}

/// Transit network graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "NetworkDocument", try_from = "NetworkDocument")]
pub struct Network {
    directed: bool,
    slots: Vec<Option<NodeSlot>>,
    index: HashMap<NodeId, usize>,
    live_nodes: usize,
    edge_count: usize,
}

impl Network {
    pub fn new(directed: bool) -> Self {
        Self {
            directed,
            slots: Vec::new(),
            index: HashMap::new(),
            live_nodes: 0,
            edge_count: 0,
        }
    }

    pub fn directed() -> Self {
        Self::new(true)
    }

    pub fn undirected() -> Self {
        Self::new(false)
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn node_count(&self) -> usize {
        self.live_nodes
    }

    /// Number of edges (arcs for directed networks)
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.live_nodes == 0
    }

    /// Upper bound (exclusive) on slot indices, for index-addressed scratch buffers
    pub fn slot_bound(&self) -> usize {
        self.slots.len()
    }

    /// Insert a node. Returns false and refreshes the attributes if the id already exists.
    pub fn add_node(&mut self, data: NodeData) -> bool {
        if let Some(&idx) = self.index.get(&data.id) {
            if let Some(slot) = self.slots[idx].as_mut() {
                slot.data = data;
            }
            return false;
        }

        let idx = self.slots.len();
        self.index.insert(data.id.clone(), idx);
        self.slots.push(Some(NodeSlot {
            data,
            succ: BTreeMap::new(),
            pred: BTreeSet::new(),
        }));
        self.live_nodes += 1;
        true
    }

    /// Insert or update an edge. Self-loops are ignored.
    /// Returns Ok(true) when a new edge was created.
    pub fn add_edge(&mut self, u: &NodeId, v: &NodeId, data: EdgeData) -> Result<bool> {
        let ui = self
            .index_of(u)
            .ok_or_else(|| ResilienceError::UnknownNode(u.clone()))?;
        let vi = self
            .index_of(v)
            .ok_or_else(|| ResilienceError::UnknownNode(v.clone()))?;
        Ok(self.add_edge_at(ui, vi, data))
    }

    /// Insert an edge whose length is the haversine distance between its
    /// endpoints, or 1.0 when either endpoint has no coordinates.
    pub fn connect(&mut self, u: &NodeId, v: &NodeId, kind: EdgeKind) -> Result<bool> {
        let ui = self
            .index_of(u)
            .ok_or_else(|| ResilienceError::UnknownNode(u.clone()))?;
        let vi = self
            .index_of(v)
            .ok_or_else(|| ResilienceError::UnknownNode(v.clone()))?;
        Ok(self.connect_at(ui, vi, kind))
    }

    /// Slot-indexed `connect`; false for a self-loop, a vacant slot or an
    /// existing edge
    pub(crate) fn connect_at(&mut self, u: usize, v: usize, kind: EdgeKind) -> bool {
        let length = match (
            self.data_at(u).and_then(|n| n.position),
            self.data_at(v).and_then(|n| n.position),
        ) {
            (Some(a), Some(b)) => a.haversine_m(&b),
            _ => 1.0,
        };
        self.add_edge_at(u, v, EdgeData::new(kind, length))
    }

    pub(crate) fn add_edge_at(&mut self, u: usize, v: usize, data: EdgeData) -> bool {
        if u == v || self.slot(u).is_none() || self.slot(v).is_none() {
            return false;
        }

        let created = match self.slots[u].as_mut() {
            Some(slot) => slot.succ.insert(v, data).is_none(),
            None => return false,
        };

        if let Some(slot) = self.slots[v].as_mut() {
            if self.directed {
                slot.pred.insert(u);
            } else {
                slot.succ.insert(u, data);
            }
        }

        if created {
            self.edge_count += 1;
        }
        created
    }

    fn slot(&self, idx: usize) -> Option<&NodeSlot> {
        self.slots.get(idx).and_then(|s| s.as_ref())
    }

    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&NodeData> {
        self.index_of(id).and_then(|idx| self.data_at(idx))
    }

    pub fn data_at(&self, idx: usize) -> Option<&NodeData> {
        self.slot(idx).map(|s| &s.data)
    }

    pub fn id_at(&self, idx: usize) -> Option<&NodeId> {
        self.slot(idx).map(|s| &s.data.id)
    }

    /// Live slot indices in insertion order
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| i))
    }

    /// Node ids in insertion order
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.slots
            .iter()
            .filter_map(|s| s.as_ref().map(|slot| slot.data.id.clone()))
            .collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> + '_ {
        self.slots.iter().filter_map(|s| s.as_ref().map(|slot| &slot.data))
    }

    /// Out-neighbours with edge data (all neighbours for undirected networks)
    pub fn successors(&self, idx: usize) -> impl Iterator<Item = (usize, &EdgeData)> + '_ {
        self.slot(idx)
            .into_iter()
            .flat_map(|s| s.succ.iter().map(|(&w, e)| (w, e)))
    }

    pub fn predecessors(&self, idx: usize) -> Vec<usize> {
        match self.slot(idx) {
            Some(s) if self.directed => s.pred.iter().copied().collect(),
            Some(s) => s.succ.keys().copied().collect(),
            None => Vec::new(),
        }
    }

    /// Neighbours ignoring direction
    pub fn undirected_neighbors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        // pred is always empty for undirected networks
        self.slot(idx)
            .into_iter()
            .flat_map(|s| s.succ.keys().copied().chain(s.pred.iter().copied()))
    }

    pub fn neighbors(&self, id: &NodeId) -> Vec<NodeId> {
        match self.index_of(id) {
            Some(idx) => self
                .successors(idx)
                .filter_map(|(w, _)| self.id_at(w).cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Total degree (in + out for directed networks)
    pub fn degree_at(&self, idx: usize) -> usize {
        self.slot(idx).map(|s| s.succ.len() + s.pred.len()).unwrap_or(0)
    }

    pub fn degree(&self, id: &NodeId) -> usize {
        self.index_of(id).map(|idx| self.degree_at(idx)).unwrap_or(0)
    }

    pub fn out_degree_at(&self, idx: usize) -> usize {
        self.slot(idx).map(|s| s.succ.len()).unwrap_or(0)
    }

    pub fn edge_at(&self, u: usize, v: usize) -> Option<&EdgeData> {
        self.slot(u).and_then(|s| s.succ.get(&v))
    }

    pub fn has_edge(&self, u: &NodeId, v: &NodeId) -> bool {
        match (self.index_of(u), self.index_of(v)) {
            (Some(ui), Some(vi)) => self.edge_at(ui, vi).is_some(),
            _ => false,
        }
    }

    /// Edge endpoints as slot pairs. Undirected edges are reported once with u < v.
    pub fn edge_indices(&self) -> Vec<(usize, usize)> {
        let mut edges = Vec::with_capacity(self.edge_count);
        for u in self.indices() {
            for (v, _) in self.successors(u) {
                if self.directed || u < v {
                    edges.push((u, v));
                }
            }
        }
        edges
    }

    pub fn edges(&self) -> Vec<(NodeId, NodeId, EdgeData)> {
        self.edge_indices()
            .into_iter()
            .filter_map(|(u, v)| {
                Some((
                    self.id_at(u)?.clone(),
                    self.id_at(v)?.clone(),
                    *self.edge_at(u, v)?,
                ))
            })
            .collect()
    }

    pub fn edge_count_of_kind(&self, kind: EdgeKind) -> usize {
        self.edge_indices()
            .into_iter()
            .filter(|&(u, v)| self.edge_at(u, v).map(|e| e.kind == kind).unwrap_or(false))
            .count()
    }

    pub fn remove_index(&mut self, idx: usize) -> bool {
        let slot = match self.slots.get_mut(idx).and_then(|s| s.take()) {
            Some(slot) => slot,
            None => return false,
        };

        for &w in slot.succ.keys() {
            if let Some(other) = self.slots[w].as_mut() {
                if self.directed {
                    other.pred.remove(&idx);
                } else {
                    other.succ.remove(&idx);
                }
            }
        }
        for &p in &slot.pred {
            if let Some(other) = self.slots[p].as_mut() {
                other.succ.remove(&idx);
            }
        }

        self.edge_count -= slot.succ.len() + slot.pred.len();
        self.live_nodes -= 1;
        self.index.remove(&slot.data.id);
        true
    }

    pub fn remove_node(&mut self, id: &NodeId) -> bool {
        match self.index_of(id) {
            Some(idx) => self.remove_index(idx),
            None => false,
        }
    }

    /// Remove every listed node that is still present; returns how many were removed
    pub fn remove_nodes<'a>(&mut self, ids: impl IntoIterator<Item = &'a NodeId>) -> usize {
        ids.into_iter().filter(|id| self.remove_node(id)).count()
    }

    pub fn remove_edge_at(&mut self, u: usize, v: usize) -> bool {
        let removed = match self.slots.get_mut(u).and_then(|s| s.as_mut()) {
            Some(slot) => slot.succ.remove(&v).is_some(),
            None => false,
        };
        if !removed {
            return false;
        }

        if let Some(other) = self.slots.get_mut(v).and_then(|s| s.as_mut()) {
            if self.directed {
                other.pred.remove(&u);
            } else {
                other.succ.remove(&u);
            }
        }
        self.edge_count -= 1;
        true
    }

    pub fn remove_edge(&mut self, u: &NodeId, v: &NodeId) -> bool {
        match (self.index_of(u), self.index_of(v)) {
            (Some(ui), Some(vi)) => self.remove_edge_at(ui, vi),
            _ => false,
        }
    }

    /// Connected components (weakly connected for directed networks),
    /// largest first, each listed as slot indices in discovery order.
    pub fn component_indices(&self) -> Vec<Vec<usize>> {
        let mut visited = vec![false; self.slots.len()];
        let mut components = Vec::new();
        let mut queue = VecDeque::new();

        for start in self.indices() {
            if visited[start] {
                continue;
            }

            let mut component = Vec::new();
            visited[start] = true;
            queue.push_back(start);

            while let Some(current) = queue.pop_front() {
                component.push(current);
                for w in self.undirected_neighbors(current) {
                    if !visited[w] {
                        visited[w] = true;
                        queue.push_back(w);
                    }
                }
            }
            components.push(component);
        }

        // Stable: equal-sized components keep discovery order
        components.sort_by_key(|c| std::cmp::Reverse(c.len()));
        components
    }

    pub fn components(&self) -> Vec<Vec<NodeId>> {
        self.component_indices()
            .into_iter()
            .map(|c| c.into_iter().filter_map(|i| self.id_at(i).cloned()).collect())
            .collect()
    }

    /// Size of the largest (weakly) connected component, 0 for an empty network
    pub fn largest_component_size(&self) -> usize {
        let mut visited = vec![false; self.slots.len()];
        let mut queue = VecDeque::new();
        let mut largest = 0;

        for start in self.indices() {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            queue.push_back(start);
            let mut size = 0;

            while let Some(current) = queue.pop_front() {
                size += 1;
                for w in self.undirected_neighbors(current) {
                    if !visited[w] {
                        visited[w] = true;
                        queue.push_back(w);
                    }
                }
            }
            largest = largest.max(size);
        }

        largest
    }

    /// Nodes reachable from `idx` along edge direction, excluding `idx` itself
    pub fn descendant_indices(&self, idx: usize) -> Vec<usize> {
        if self.slot(idx).is_none() {
            return Vec::new();
        }

        let mut visited = vec![false; self.slots.len()];
        let mut queue = VecDeque::new();
        let mut reached = Vec::new();
        visited[idx] = true;
        queue.push_back(idx);

        while let Some(current) = queue.pop_front() {
            for (w, _) in self.successors(current) {
                if !visited[w] {
                    visited[w] = true;
                    reached.push(w);
                    queue.push_back(w);
                }
            }
        }
        reached
    }

    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        match self.index_of(id) {
            Some(idx) => self
                .descendant_indices(idx)
                .into_iter()
                .filter_map(|i| self.id_at(i).cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Unweighted hop distances from `source`; `u32::MAX` marks unreachable slots
    pub fn hop_distances(&self, source: usize) -> Vec<u32> {
        let mut dist = vec![u32::MAX; self.slots.len()];
        if self.slot(source).is_none() {
            return dist;
        }

        let mut queue = VecDeque::new();
        dist[source] = 0;
        queue.push_back(source);

        while let Some(current) = queue.pop_front() {
            let next = dist[current] + 1;
            for (w, _) in self.successors(current) {
                if dist[w] == u32::MAX {
                    dist[w] = next;
                    queue.push_back(w);
                }
            }
        }
        dist
    }

    /// Length-weighted distances from `source`; infinity marks unreachable slots
    pub fn path_lengths(&self, source: usize) -> Vec<f64> {
        let mut dist = vec![f64::INFINITY; self.slots.len()];
        if self.slot(source).is_none() {
            return dist;
        }

        let mut heap = BinaryHeap::new();
        dist[source] = 0.0;
        heap.push(HeapEntry { cost: 0.0, node: source });

        while let Some(HeapEntry { cost, node }) = heap.pop() {
            if cost > dist[node] {
                continue;
            }
            for (w, edge) in self.successors(node) {
                let next = cost + edge.length;
                if next < dist[w] {
                    dist[w] = next;
                    heap.push(HeapEntry { cost: next, node: w });
                }
            }
        }
        dist
    }

    /// Length-weighted shortest path between two ids
    pub fn shortest_path(&self, source: &NodeId, target: &NodeId) -> Option<Vec<NodeId>> {
        let s = self.index_of(source)?;
        let t = self.index_of(target)?;
        let mut finder = PathFinder::new(self.slot_bound());
        finder
            .shortest_path(self, s, t)
            .map(|path| path.into_iter().filter_map(|i| self.id_at(i).cloned()).collect())
    }

    /// Induced subgraph on the given nodes, keeping this network's insertion order
    pub fn subgraph(&self, ids: &[NodeId]) -> Network {
        let keep: HashSet<usize> = ids.iter().filter_map(|id| self.index_of(id)).collect();
        self.filtered(|idx| keep.contains(&idx), |_| true)
    }

    /// Copy without edges of the given kind ("isolated" network when kind is Walk)
    pub fn without_edge_kind(&self, kind: EdgeKind) -> Network {
        self.filtered(|_| true, |edge| edge.kind != kind)
    }

    fn filtered(
        &self,
        keep_node: impl Fn(usize) -> bool,
        keep_edge: impl Fn(&EdgeData) -> bool,
    ) -> Network {
        let mut out = Network::new(self.directed);
        let mut remap: HashMap<usize, usize> = HashMap::new();

        for idx in self.indices().filter(|&i| keep_node(i)) {
            if let Some(data) = self.data_at(idx) {
                remap.insert(idx, out.slots.len());
                out.add_node(data.clone());
            }
        }

        for (u, v) in self.edge_indices() {
            if let (Some(&nu), Some(&nv), Some(edge)) =
                (remap.get(&u), remap.get(&v), self.edge_at(u, v))
            {
                if keep_edge(edge) {
                    out.add_edge_at(nu, nv, *edge);
                }
            }
        }
        out
    }

    /// Ids of the nodes belonging to a transit subsystem
    pub fn nodes_with_mode(&self, mode: &TransitMode) -> Vec<NodeId> {
        self.nodes()
            .filter(|n| n.mode.as_ref() == Some(mode))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Directed copy; every undirected edge becomes a pair of opposite arcs
    pub fn to_directed(&self) -> Network {
        if self.directed {
            return self.clone();
        }

        let mut out = Network::directed();
        for data in self.nodes() {
            out.add_node(data.clone());
        }
        for (u, v) in self.edge_indices() {
            if let (Some(a), Some(b), Some(edge)) = (self.id_at(u), self.id_at(v), self.edge_at(u, v)) {
                let (Some(na), Some(nb)) = (out.index_of(a), out.index_of(b)) else {
                    continue;
                };
                out.add_edge_at(na, nb, *edge);
                out.add_edge_at(nb, na, *edge);
            }
        }
        out
    }
}

/// Min-heap entry for Dijkstra. Ties resolve to the smaller slot index.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapEntry {
    cost: f64,
    node: usize,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reusable Dijkstra scratch space for many point-to-point queries on
/// networks sharing one slot layout.
pub struct PathFinder {
    dist: Vec<f64>,
    prev: Vec<usize>,
    touched: Vec<usize>,
    heap: BinaryHeap<HeapEntry>,
}

impl PathFinder {
    pub fn new(slot_bound: usize) -> Self {
        Self {
            dist: vec![f64::INFINITY; slot_bound],
            prev: vec![usize::MAX; slot_bound],
            touched: Vec::new(),
            heap: BinaryHeap::new(),
        }
    }

    fn reset(&mut self, slot_bound: usize) {
        for &i in &self.touched {
            self.dist[i] = f64::INFINITY;
            self.prev[i] = usize::MAX;
        }
        self.touched.clear();
        self.heap.clear();
        if self.dist.len() < slot_bound {
            self.dist.resize(slot_bound, f64::INFINITY);
            self.prev.resize(slot_bound, usize::MAX);
        }
    }

    /// Length-weighted shortest path from `source` to `target` as slot indices,
    /// or None when the target is unreachable.
    pub fn shortest_path(&mut self, net: &Network, source: usize, target: usize) -> Option<Vec<usize>> {
        net.slot(source)?;
        net.slot(target)?;
        if source == target {
            return Some(vec![source]);
        }

        self.reset(net.slot_bound());
        self.dist[source] = 0.0;
        self.touched.push(source);
        self.heap.push(HeapEntry { cost: 0.0, node: source });

        let mut found = false;
        while let Some(HeapEntry { cost, node }) = self.heap.pop() {
            if node == target {
                found = true;
                break;
            }
            if cost > self.dist[node] {
                continue;
            }
            for (w, edge) in net.successors(node) {
                let next = cost + edge.length;
                if next < self.dist[w] {
                    if self.dist[w].is_infinite() {
                        self.touched.push(w);
                    }
                    self.dist[w] = next;
                    self.prev[w] = node;
                    self.heap.push(HeapEntry { cost: next, node: w });
                }
            }
        }

        if !found {
            return None;
        }

        let mut path = vec![target];
        let mut current = target;
        while current != source {
            current = self.prev[current];
            path.push(current);
        }
        path.reverse();
        Some(path)
    }
}

/// Serialized node record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default)]
    pub mode: Option<TransitMode>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub lat: Option<f64>,
}

/// Serialized edge record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub kind: EdgeKind,
    /// Missing lengths are derived from endpoint coordinates
    #[serde(default)]
    pub length: Option<f64>,
}

/// Edge-list document exchanged with the graph-construction side.
///
/// Optional fields are always written (as null in JSON) so the same document
/// also round-trips through the non-self-describing trial codec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDocument {
    #[serde(default)]
    pub directed: bool,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl From<Network> for NetworkDocument {
    fn from(net: Network) -> Self {
        let nodes = net
            .nodes()
            .map(|n| NodeRecord {
                id: n.id.clone(),
                mode: n.mode.clone(),
                name: n.name.clone(),
                lon: n.position.map(|p| p.lon),
                lat: n.position.map(|p| p.lat),
            })
            .collect();
        let edges = net
            .edges()
            .into_iter()
            .map(|(source, target, data)| EdgeRecord {
                source,
                target,
                kind: data.kind,
                length: Some(data.length),
            })
            .collect();

        Self {
            directed: net.directed,
            nodes,
            edges,
        }
    }
}

impl TryFrom<NetworkDocument> for Network {
    type Error = ResilienceError;

    fn try_from(doc: NetworkDocument) -> Result<Self> {
        let mut net = Network::new(doc.directed);

        for record in doc.nodes {
            let position = match (record.lon, record.lat) {
                (Some(lon), Some(lat)) => Some(GeoPoint::new(lon, lat).ok_or_else(|| {
                    ResilienceError::InvalidConfig(format!(
                        "node {} has invalid coordinates ({}, {})",
                        record.id, lon, lat
                    ))
                })?),
                _ => None,
            };

            let id = record.id.clone();
            let inserted = net.add_node(NodeData {
                id: record.id,
                mode: record.mode,
                name: record.name,
                position,
            });
            if !inserted {
                return Err(ResilienceError::InvalidConfig(format!(
                    "duplicate node id {}",
                    id
                )));
            }
        }

        for record in doc.edges {
            match record.length {
                Some(length) if length.is_finite() && length >= 0.0 => {
                    net.add_edge(&record.source, &record.target, EdgeData::new(record.kind, length))?;
                }
                Some(length) => {
                    return Err(ResilienceError::InvalidConfig(format!(
                        "edge {} -> {} has invalid length {}",
                        record.source, record.target, length
                    )));
                }
                None => {
                    net.connect(&record.source, &record.target, record.kind)?;
                }
            }
        }

        Ok(net)
    }
}

impl Network {
    /// Load a network from an edge-list JSON document
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let doc: NetworkDocument = serde_json::from_reader(std::io::BufReader::new(file))?;
        Network::try_from(doc)
    }
}
