// ===========================================================================
// Planar Topology Graph
// ===========================================================================
//
// Arena of nodes and edges addressed by stable ids. Nodes are unique per
// snapped planar coordinate; edges reference their endpoint nodes by id and
// every node lists the edges incident to it.
//
// All mutation goes through the primitives below. Each primitive updates the
// arenas, the incidence lists, the coordinate lookup and both spatial indices
// together, so the graph is consistent between any two calls.
// ===========================================================================

mod edge;
mod events;
mod node;
mod spatial_index;

pub use edge::{Edge, EdgeId, Incidence};
pub use events::GraphEvent;
pub use node::{Node, NodeId};
pub use spatial_index::SpatialIndex;

use crate::error::GraphError;
use crate::geometry::measure::{interpolate_z, locate_point, point_line_distance};
use crate::geometry::{Envelope, expand, point_envelope};
use crate::payload::Payload;
use crate::precision::{CoordKey, Coordinate, PrecisionModel};
use ahash::AHashMap;
use log::{debug, trace};
use ordered_float::OrderedFloat;

pub struct Graph<T> {
    precision: PrecisionModel,
    nodes: Vec<Option<Node>>,
    edges: Vec<Edge<T>>,
    node_lookup: AHashMap<CoordKey, NodeId>,
    node_index: SpatialIndex<NodeId>,
    edge_index: SpatialIndex<EdgeId>,
    live_nodes: usize,
    live_edges: usize,
    events: Vec<GraphEvent>,
}

impl<T: Payload> Graph<T> {
    pub fn new(precision: PrecisionModel) -> Self {
        Self {
            precision,
            nodes: Vec::new(),
            edges: Vec::new(),
            node_lookup: AHashMap::new(),
            node_index: SpatialIndex::new(),
            edge_index: SpatialIndex::new(),
            live_nodes: 0,
            live_edges: 0,
            events: Vec::new(),
        }
    }

    /// Build a graph with one edge per payload, using the payload's own geometry.
    /// Payloads that cannot become an edge are reported by label.
    pub fn from_payloads(
        precision: PrecisionModel,
        payloads: impl IntoIterator<Item = T>,
    ) -> (Self, Vec<(String, GraphError)>) {
        let mut graph = Self::new(precision);
        let mut rejected = Vec::new();
        for payload in payloads {
            let label = payload.label();
            if let Err(err) = graph.add_payload(payload) {
                rejected.push((label, err));
            }
        }
        (graph, rejected)
    }

    pub fn precision(&self) -> &PrecisionModel {
        &self.precision
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Any edge ever created, including removed tombstones.
    pub fn edge(&self, id: EdgeId) -> Option<&Edge<T>> {
        self.edges.get(id.0)
    }

    /// The edge if it exists and has not been removed.
    pub fn live_edge(&self, id: EdgeId) -> Option<&Edge<T>> {
        self.edges.get(id.0).filter(|e| !e.removed)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().flatten()
    }

    /// Live edges in id order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge<T>> {
        self.edges.iter().filter(|e| !e.removed)
    }

    pub fn node_count(&self) -> usize {
        self.live_nodes
    }

    pub fn edge_count(&self) -> usize {
        self.live_edges
    }

    /// Snapshot of live node ids, for passes that mutate while they walk.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes().map(|n| n.id).collect()
    }

    /// Snapshot of live edge ids, for passes that mutate while they walk.
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges().map(|e| e.id).collect()
    }

    /// Exact lookup of the node at the snapped position of `coord`.
    pub fn node_at(&self, coord: &Coordinate) -> Option<NodeId> {
        let snapped = self.precision.snap(coord);
        self.node_lookup.get(&CoordKey::of(&snapped)).copied()
    }

    /// Live edges whose bounding box intersects `envelope`, sorted by id.
    pub fn edges_in(&self, envelope: &Envelope) -> Vec<EdgeId> {
        let mut ids = self.edge_index.query(envelope);
        ids.sort_unstable();
        ids
    }

    /// Nodes inside `envelope`, sorted by id.
    pub fn nodes_in(&self, envelope: &Envelope) -> Vec<NodeId> {
        let mut ids = self.node_index.query(envelope);
        ids.sort_unstable();
        ids
    }

    /// Live edges passing within `tolerance` of `coord`, sorted by id.
    pub fn edges_near(&self, coord: &Coordinate, tolerance: f64) -> Vec<EdgeId> {
        let envelope = expand(&point_envelope(coord), tolerance);
        self.edges_in(&envelope)
            .into_iter()
            .filter(|&id| {
                self.live_edge(id)
                    .is_some_and(|e| point_line_distance(coord, &e.line) <= tolerance)
            })
            .collect()
    }

    pub fn events(&self) -> &[GraphEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    /// Consume the graph, yielding the payloads of the surviving edges.
    pub fn into_payloads(self) -> Vec<T> {
        self.edges
            .into_iter()
            .filter(|e| !e.removed)
            .map(|e| e.payload)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    /// Node at the snapped position of `coord`, created if absent.
    pub fn get_or_create_node(&mut self, coord: &Coordinate) -> NodeId {
        let snapped = self.precision.snap(coord);
        let key = CoordKey::of(&snapped);
        if let Some(&id) = self.node_lookup.get(&key) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node::new(id, snapped)));
        self.node_lookup.insert(key, id);
        self.node_index.insert(point_envelope(&snapped), id);
        self.live_nodes += 1;
        trace!("created node {} at {}", id, snapped);
        id
    }

    /// Closest existing node within `tolerance` of `coord`. Never creates.
    pub fn find_node(&self, coord: &Coordinate, tolerance: f64) -> Option<NodeId> {
        let envelope = expand(&point_envelope(coord), tolerance);
        self.node_index
            .query(&envelope)
            .into_iter()
            .filter_map(|id| self.node(id))
            .map(|n| (n.coordinate.distance_2d(coord), n.id))
            .filter(|(d, _)| *d <= tolerance)
            .min_by_key(|(d, id)| (OrderedFloat(*d), *id))
            .map(|(_, id)| id)
    }

    /// Drop a node that has no incident edges. Returns whether it was dropped.
    pub fn prune_node(&mut self, id: NodeId) -> Result<bool, GraphError> {
        let node = self.node(id).ok_or(GraphError::UnknownNode(id))?;
        if node.degree() > 0 {
            return Ok(false);
        }
        self.destroy_node(id);
        Ok(true)
    }

    fn destroy_node(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) {
            self.node_lookup.remove(&CoordKey::of(&node.coordinate));
            self.node_index.remove(point_envelope(&node.coordinate), id);
            self.live_nodes -= 1;
            trace!("destroyed node {} at {}", id, node.coordinate);
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(GraphError::UnknownNode(id))
    }

    fn live_edge_checked(&self, id: EdgeId) -> Result<&Edge<T>, GraphError> {
        let edge = self.edges.get(id.0).ok_or(GraphError::UnknownEdge(id))?;
        if edge.removed {
            return Err(GraphError::EdgeRemoved(id));
        }
        Ok(edge)
    }

    // -----------------------------------------------------------------------
    // Edges
    // -----------------------------------------------------------------------

    /// Add an edge over `line`. The line is snapped, endpoint nodes are
    /// created or reused, and the payload's geometry is set to the snapped line.
    pub fn add_edge(&mut self, line: Vec<Coordinate>, payload: T) -> Result<EdgeId, GraphError> {
        let id = self.insert_edge(line, payload)?;
        self.events.push(GraphEvent::EdgeAdded { id });
        Ok(id)
    }

    /// Add an edge over the payload's own geometry.
    pub fn add_payload(&mut self, payload: T) -> Result<EdgeId, GraphError> {
        let line = payload.geometry().to_vec();
        self.add_edge(line, payload)
    }

    fn insert_edge(&mut self, line: Vec<Coordinate>, mut payload: T) -> Result<EdgeId, GraphError> {
        if line.len() < 2 {
            return Err(GraphError::DegenerateLine { points: line.len() });
        }
        let line = self.precision.snap_line(&line);
        let from = self.get_or_create_node(&line[0]);
        let to = self.get_or_create_node(&line[line.len() - 1]);

        let id = EdgeId(self.edges.len());
        payload.set_geometry(line.clone());
        let edge = Edge::new(id, line, payload, from, to);
        self.edge_index.insert(edge.envelope, id);
        self.edges.push(edge);
        self.live_edges += 1;

        self.node_mut(from)?.incident.push(id);
        self.node_mut(to)?.incident.push(id);
        trace!("added edge {} ({} -> {})", id, from, to);
        Ok(id)
    }

    /// Remove an edge: tombstone it, detach it from both endpoints and the
    /// index, and destroy endpoints left with no edges.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<(), GraphError> {
        self.detach_edge(id)?;
        self.events.push(GraphEvent::EdgeRemoved { id });
        Ok(())
    }

    fn detach_edge(&mut self, id: EdgeId) -> Result<(), GraphError> {
        let (from, to, envelope) = {
            let edge = self.live_edge_checked(id)?;
            (edge.from, edge.to, edge.envelope)
        };
        self.edges[id.0].removed = true;
        self.live_edges -= 1;
        self.edge_index.remove(envelope, id);

        for node_id in [from, to] {
            let empty = match self.nodes.get_mut(node_id.0).and_then(Option::as_mut) {
                Some(node) => {
                    node.detach(id);
                    node.degree() == 0
                }
                None => false,
            };
            if empty {
                self.destroy_node(node_id);
            }
        }
        trace!("removed edge {}", id);
        Ok(())
    }

    /// Swap an edge's line for `new_line`, keeping its payload. The edge gets
    /// a new id; the old id becomes a tombstone.
    pub fn replace_edge(&mut self, id: EdgeId, new_line: Vec<Coordinate>) -> Result<EdgeId, GraphError> {
        let payload = self.live_edge_checked(id)?.payload.clone();
        // Insert first so shared endpoints are never destroyed and recreated
        let new_id = self.insert_edge(new_line, payload)?;
        self.detach_edge(id)?;
        debug!("edge {} changed to {}", id, new_id);
        self.events.push(GraphEvent::EdgeChanged {
            old: id,
            new: vec![new_id],
        });
        Ok(new_id)
    }

    /// Cut an edge at the projections of `split_nodes` onto its line.
    ///
    /// Nodes are ordered by their position along the line. Nodes projecting
    /// onto an endpoint are ignored. Each fragment gets its own clone of the
    /// payload and ends exactly at the splitting node's coordinate. With no
    /// interior cut the edge is returned unchanged.
    pub fn split_edge(&mut self, id: EdgeId, split_nodes: &[NodeId]) -> Result<Vec<EdgeId>, GraphError> {
        let edge = self.live_edge_checked(id)?;
        let line = edge.line.clone();
        let payload = edge.payload.clone();
        let (from, to) = (edge.from, edge.to);

        let mut cuts = Vec::with_capacity(split_nodes.len());
        for &node_id in split_nodes {
            let node = self.node(node_id).ok_or(GraphError::UnknownNode(node_id))?;
            if node_id == from || node_id == to {
                continue;
            }
            if let Some(pos) = locate_point(&line, &node.coordinate) {
                cuts.push((pos, node.coordinate));
            }
        }
        cuts.sort_by_key(|(pos, _)| OrderedFloat(pos.distance_along));
        cuts.dedup_by(|a, b| a.1.eq_2d(&b.1));

        let fragments = cut_line(&line, &cuts);
        if fragments.len() < 2 {
            return Ok(vec![id]);
        }

        let mut new_ids = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            new_ids.push(self.insert_edge(fragment, payload.clone())?);
        }
        self.detach_edge(id)?;
        debug!("split edge {} into {:?}", id, new_ids);
        self.events.push(GraphEvent::EdgeChanged {
            old: id,
            new: new_ids.clone(),
        });
        Ok(new_ids)
    }

    /// Join two edges meeting at `node` into one.
    ///
    /// `first` is oriented to end at the node and `second` to start there, so
    /// passing the incoming edge first preserves direction. The shared vertex
    /// appears once. The new edge takes `first`'s payload. The node is
    /// destroyed if no other edge uses it.
    pub fn merge(&mut self, node: NodeId, first: EdgeId, second: EdgeId) -> Result<EdgeId, GraphError> {
        let invalid = |reason| GraphError::InvalidMerge {
            node,
            first,
            second,
            reason,
        };
        if first == second {
            return Err(invalid("an edge cannot merge with itself"));
        }
        self.node(node).ok_or(GraphError::UnknownNode(node))?;
        let a = self.live_edge_checked(first)?;
        let b = self.live_edge_checked(second)?;
        if a.is_loop() || b.is_loop() {
            return Err(invalid("loop edges cannot be merged"));
        }

        let mut head = match a.line_from(node) {
            Some(mut l) => {
                l.reverse();
                l
            }
            None => return Err(invalid("first edge is not incident to the node")),
        };
        let tail = b
            .line_from(node)
            .ok_or_else(|| invalid("second edge is not incident to the node"))?;
        let joint = head[head.len() - 1];
        if !joint.eq_2d(&tail[0]) {
            return Err(invalid("edge endpoints do not meet"));
        }
        if joint.is_z_missing() && !tail[0].is_z_missing() {
            let last = head.len() - 1;
            head[last].z = tail[0].z;
        }
        head.extend_from_slice(&tail[1..]);
        let payload = a.payload.clone();

        let new_id = self.insert_edge(head, payload)?;
        self.detach_edge(first)?;
        self.detach_edge(second)?;
        debug!("merged {} and {} at {} into {}", first, second, node, new_id);
        self.events.push(GraphEvent::EdgesMerged {
            old: [first, second],
            new: new_id,
            at: node,
        });
        Ok(new_id)
    }

    /// Relocate a node to the snapped position of `target`, dragging the
    /// matching endpoint of every incident edge along. If another node already
    /// occupies that position the two are coalesced and the survivor's id is
    /// returned.
    pub fn move_node(&mut self, id: NodeId, target: &Coordinate) -> Result<NodeId, GraphError> {
        let snapped = self.precision.snap(target);
        let (old, incident) = {
            let node = self.node(id).ok_or(GraphError::UnknownNode(id))?;
            (node.coordinate, node.incident.clone())
        };
        let key = CoordKey::of(&snapped);
        if key == CoordKey::of(&old) {
            return Ok(id);
        }

        let destination = match self.node_lookup.get(&key).copied() {
            Some(existing) => existing,
            None => {
                self.node_lookup.remove(&CoordKey::of(&old));
                self.node_index.remove(point_envelope(&old), id);
                self.node_lookup.insert(key, id);
                self.node_index.insert(point_envelope(&snapped), id);
                self.node_mut(id)?.coordinate = snapped;
                id
            }
        };

        let mut seen = Vec::with_capacity(incident.len());
        for edge_id in incident {
            if seen.contains(&edge_id) {
                continue;
            }
            seen.push(edge_id);
            self.relink_endpoints(edge_id, id, destination, &snapped);
        }

        self.events.push(GraphEvent::NodeMoved {
            node: id,
            from: old,
            to: snapped,
        });
        if destination != id {
            let moved = std::mem::take(&mut self.node_mut(id)?.incident);
            self.node_mut(destination)?.incident.extend(moved);
            self.destroy_node(id);
            debug!("node {} coalesced into {} at {}", id, destination, snapped);
            self.events.push(GraphEvent::NodesCoalesced {
                removed: id,
                kept: destination,
            });
        } else {
            debug!("node {} moved from {} to {}", id, old, snapped);
        }
        Ok(destination)
    }

    fn relink_endpoints(&mut self, edge_id: EdgeId, old: NodeId, new: NodeId, at: &Coordinate) {
        let edge = &mut self.edges[edge_id.0];
        let old_envelope = edge.envelope;
        let last = edge.line.len() - 1;
        if edge.from == old {
            edge.line[0] = edge.line[0].moved_to(at);
            edge.from = new;
        }
        if edge.to == old {
            edge.line[last] = edge.line[last].moved_to(at);
            edge.to = new;
        }
        edge.refresh_envelope();
        edge.payload.set_geometry(edge.line.clone());
        let new_envelope = edge.envelope;
        self.edge_index.remove(old_envelope, edge_id);
        self.edge_index.insert(new_envelope, edge_id);
    }

    // -----------------------------------------------------------------------
    // Consistency
    // -----------------------------------------------------------------------

    /// Every broken invariant found, as text. Empty for a healthy graph.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for node in self.nodes() {
            let key = CoordKey::of(&node.coordinate);
            if self.node_lookup.get(&key) != Some(&node.id) {
                problems.push(format!("{} missing from coordinate lookup", node.id));
            }
            if !self.node_index.query(&point_envelope(&node.coordinate)).contains(&node.id) {
                problems.push(format!("{} missing from node index", node.id));
            }
            for &e in &node.incident {
                match self.live_edge(e) {
                    Some(edge) if edge.from == node.id || edge.to == node.id => {}
                    Some(_) => problems.push(format!("{} lists {} which does not touch it", node.id, e)),
                    None => problems.push(format!("{} lists removed edge {}", node.id, e)),
                }
            }
        }
        for edge in self.edges() {
            for (end, node_id, coord) in [("from", edge.from, edge.first()), ("to", edge.to, edge.last())] {
                match self.node(node_id) {
                    Some(node) => {
                        if !node.coordinate.eq_2d(coord) {
                            problems.push(format!("{} {} end does not sit on {}", edge.id, end, node_id));
                        }
                        let expected = if edge.is_loop() { 2 } else { 1 };
                        let count = node.incident.iter().filter(|&&e| e == edge.id).count();
                        if count != expected {
                            problems.push(format!("{} listed {} times at {}", edge.id, count, node_id));
                        }
                    }
                    None => problems.push(format!("{} {} node {} is gone", edge.id, end, node_id)),
                }
            }
            if !self.edge_index.query(&edge.envelope).contains(&edge.id) {
                problems.push(format!("{} missing from edge index", edge.id));
            }
        }
        if self.edge_index.len() != self.live_edges {
            problems.push(format!(
                "edge index holds {} entries for {} live edges",
                self.edge_index.len(),
                self.live_edges
            ));
        }
        if self.node_lookup.len() != self.live_nodes || self.node_index.len() != self.live_nodes {
            problems.push("node lookup or index out of step with node arena".to_string());
        }
        problems
    }
}

/// Cut `line` at the given positions. Each cut point replaces the line's
/// planar position at that spot; z comes from the line where it has one.
fn cut_line(line: &[Coordinate], cuts: &[(crate::geometry::LinePosition, Coordinate)]) -> Vec<Vec<Coordinate>> {
    let last_vertex = line.len() - 1;
    let mut fragments = Vec::new();
    let mut current = vec![line[0]];
    let mut next_vertex = 1;

    for (pos, at) in cuts {
        let s = pos.segment;
        // The cut can sit exactly on a vertex
        let (on_vertex, z) = if pos.fraction <= 0.0 {
            (Some(s), line[s].z)
        } else if pos.fraction >= 1.0 {
            (Some(s + 1), line[s + 1].z)
        } else {
            (None, interpolate_z(&line[s], &line[s + 1], pos.fraction))
        };
        if on_vertex == Some(0) || on_vertex == Some(last_vertex) {
            continue;
        }
        let upto = on_vertex.map_or(s, |v| v - 1);
        if next_vertex <= upto {
            current.extend_from_slice(&line[next_vertex..=upto]);
        }
        let cut_point = Coordinate { x: at.x, y: at.y, z, m: f64::NAN };
        current.push(cut_point);
        if is_proper_fragment(&current) {
            fragments.push(std::mem::replace(&mut current, vec![cut_point]));
        } else {
            current = vec![cut_point];
        }
        next_vertex = next_vertex.max(on_vertex.map_or(s + 1, |v| v + 1));
    }

    if next_vertex <= last_vertex {
        current.extend_from_slice(&line[next_vertex..]);
    }
    if is_proper_fragment(&current) {
        fragments.push(current);
    } else if let Some(prev) = fragments.last_mut() {
        // Trailing piece collapsed onto the last cut, so that cut is dropped
        let end = line[last_vertex];
        let tail = prev.len() - 1;
        prev[tail] = end;
    }
    fragments
}

fn is_proper_fragment(line: &[Coordinate]) -> bool {
    line.len() >= 2 && line.iter().any(|c| !c.eq_2d(&line[0]))
}

#[cfg(test)]
mod tests;
