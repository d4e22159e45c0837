use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use ssair_graph::EdgeKind;

use crate::error::IrError;
use crate::function::FunctionId;
use crate::program::Program;

impl Program {
    /// Graphviz rendering of the CFG. Blocks are visited in depth-first
    /// preorder; forward edges are green, cross edges red, dummy edges dotted.
    pub fn cfg_dot(&self, func: FunctionId) -> String {
        let cfg = &self.functions[func].cfg;
        let mut out = String::from("digraph G {\n");

        for node in cfg.iter_dfs(true) {
            let from = self.blocks[*cfg.payload(node)].id;

            for edge in cfg.outgoing(node) {
                let edge = cfg.edge(edge);
                let to = self.blocks[*cfg.payload(edge.target)].id;

                let attr = match edge.kind {
                    EdgeKind::Forward => " [color=green]",
                    EdgeKind::Cross => " [color=red]",
                    EdgeKind::Dummy => " [style=dotted]",
                    EdgeKind::Tree | EdgeKind::Back | EdgeKind::Unknown => "",
                };
                let _ = writeln!(out, "\t{} -> {}{};", from, to, attr);
            }
        }

        out.push_str("}\n");
        out
    }

    /// Appends the CFG graph of the function to the file at `path`.
    pub fn write_cfg_dot(&self, func: FunctionId, path: &Path) -> Result<(), IrError> {
        let io_error = |source| IrError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_error)?;
        log::info!("printing control flow graph to: {}", path.display());

        file.write_all(self.cfg_dot(func).as_bytes())
            .map_err(io_error)?;
        Ok(())
    }
}
