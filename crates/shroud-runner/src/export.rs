//! Graph export formats: edgelist, adjacency CSV, GML, GraphML.

use std::io::Write;
use std::path::Path;

use shroud_graph::SocialGraph;

use crate::error::Result;

/// Write a whitespace edgelist: one `a b tier` line per undirected edge.
pub fn write_edgelist<P: AsRef<Path>>(graph: &SocialGraph, path: P) -> Result<()> {
    let mut out = std::fs::File::create(path)?;
    for (pair, tier) in graph.edges() {
        writeln!(out, "{} {} {}", pair.a(), pair.b(), tier.label())?;
    }
    Ok(())
}

/// Write adjacency CSV: one row per node, id first, neighbor ids after.
pub fn write_adjacency_csv<P: AsRef<Path>>(graph: &SocialGraph, path: P) -> Result<()> {
    let mut out = std::fs::File::create(path)?;
    writeln!(out, "id,neighbors")?;
    for u in graph.node_ids() {
        let mut neighbors: Vec<u32> = graph.neighbors(u).iter().map(|v| v.0).collect();
        neighbors.sort_unstable();
        let joined = neighbors
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{},{}", u, joined)?;
    }
    Ok(())
}

/// Write GML with tier labels on edges.
pub fn write_gml<P: AsRef<Path>>(graph: &SocialGraph, path: P) -> Result<()> {
    let mut out = std::fs::File::create(path)?;
    writeln!(out, "graph [")?;
    writeln!(out, "  directed 0")?;
    for u in graph.node_ids() {
        writeln!(out, "  node [")?;
        writeln!(out, "    id {}", u)?;
        writeln!(out, "  ]")?;
    }
    for (pair, tier) in graph.edges() {
        writeln!(out, "  edge [")?;
        writeln!(out, "    source {}", pair.a())?;
        writeln!(out, "    target {}", pair.b())?;
        writeln!(out, "    label \"{}\"", tier.label())?;
        writeln!(out, "  ]")?;
    }
    writeln!(out, "]")?;
    Ok(())
}

/// Write GraphML with a `tier` edge attribute.
pub fn write_graphml<P: AsRef<Path>>(graph: &SocialGraph, path: P) -> Result<()> {
    let mut out = std::fs::File::create(path)?;
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        out,
        r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns">"#
    )?;
    writeln!(
        out,
        r#"  <key id="tier" for="edge" attr.name="tier" attr.type="string"/>"#
    )?;
    writeln!(out, r#"  <graph id="G" edgedefault="undirected">"#)?;
    for u in graph.node_ids() {
        writeln!(out, r#"    <node id="n{}"/>"#, u)?;
    }
    for (pair, tier) in graph.edges() {
        writeln!(
            out,
            r#"    <edge source="n{}" target="n{}"><data key="tier">{}</data></edge>"#,
            pair.a(),
            pair.b(),
            tier.label()
        )?;
    }
    writeln!(out, "  </graph>")?;
    writeln!(out, "</graphml>")?;
    Ok(())
}
