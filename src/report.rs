//! Textual outputs: network dump and k-path listing.

use chrono::{DateTime, Utc};
use std::io::{self, Write};

use crate::generator::KPathRecord;
use crate::network::Network;

/// Column header of the network dump.
pub const NETWORK_DUMP_HEADER: &str =
    "Name\t Kind\t FrNode\t ToNode\t length\t MaxSpeed\t Lanes\t CR-Curve\t EstCap.\t Free-Flow TT\t Weight\t Connection";

/// Write one tab-separated row per real edge, in insertion order.
pub fn write_network_dump<W: Write>(network: &Network, mut out: W) -> io::Result<()> {
    writeln!(out, "{NETWORK_DUMP_HEADER}")?;
    for (_, edge) in network.real_edges() {
        let attrs = &edge.attrs;
        let curve = attrs
            .cr_curve
            .map(|c| c.to_string())
            .unwrap_or_else(|| "None".to_string());
        writeln!(
            out,
            "{}\t {}\t {}\t {}\t {}\t {}\t {}\t {}\t {}\t {}\t {}\t {}",
            edge.label(),
            edge.kind(),
            network.vertex_name(edge.source()),
            network.vertex_name(edge.target()),
            attrs.length,
            attrs.max_speed,
            attrs.lanes,
            curve,
            attrs.capacity,
            attrs.free_flow_time,
            attrs.weight,
            attrs.connection.code(),
        )?;
    }
    out.flush()
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Write the k-path listing as a `<routes>` document.
pub fn write_kpath_listing<W: Write>(records: &[KPathRecord], generated_at: DateTime<Utc>, mut out: W) -> io::Result<()> {
    writeln!(out, "<?xml version=\"1.0\"?>")?;
    writeln!(
        out,
        "<!-- generated on {} by route-kernel {} -->",
        generated_at.to_rfc3339(),
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out, "<routes>")?;
    for record in records {
        writeln!(
            out,
            "    <path id=\"{}\" source=\"{}\" target=\"{}\" pathcost=\"{}\">",
            record.id,
            escape_attr(&record.source),
            escape_attr(&record.target),
            record.cost
        )?;
        writeln!(out, "        <route>{}</route>", record.edges.join(" "))?;
        writeln!(out, "    </path>")?;
    }
    writeln!(out, "</routes>")?;
    out.flush()
}
