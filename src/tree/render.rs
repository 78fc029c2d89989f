use super::{FileTree, NodeData, NodeId};

const BRANCH_MID: &str = "├── ";
const BRANCH_LAST: &str = "└── ";
const INDENT_PIPE: &str = "│   ";
const INDENT_BLANK: &str = "    ";

impl FileTree {
    /// Renders the tree as indented box-drawing lines, children in
    /// ascending name order, every line `\n`-terminated. The root itself is
    /// not printed. Hidden nodes are skipped; collapsed directories are
    /// printed without their children. With `show_attributes`, every line
    /// is prefixed by a fixed-width column of the node's mode, owner and
    /// size.
    pub fn render(&self, show_attributes: bool) -> String {
        let mut out = String::new();
        self.render_children(self.root_id(), "", show_attributes, &mut out);
        out
    }

    fn render_children(&self, id: NodeId, prefix: &str, show_attributes: bool, out: &mut String) {
        let visible: Vec<NodeId> = self
            .get(id)
            .children()
            .map(|(_, child)| child)
            .filter(|child| !self.get(*child).data.view_info.hidden)
            .collect();

        let count = visible.len();
        for (position, child) in visible.into_iter().enumerate() {
            let last = position + 1 == count;
            let node = self.get(child);

            if show_attributes {
                out.push_str(&render_attributes(&node.data));
            }
            out.push_str(prefix);
            out.push_str(if last { BRANCH_LAST } else { BRANCH_MID });
            if let Some(name) = node.name() {
                out.push_str(&String::from_utf8_lossy(name.as_bytes()));
            }
            out.push('\n');

            if node.data.view_info.collapsed {
                continue;
            }
            let child_prefix = format!("{prefix}{}", if last { INDENT_BLANK } else { INDENT_PIPE });
            self.render_children(child, &child_prefix, show_attributes, out);
        }
    }
}

fn render_attributes(data: &NodeData) -> String {
    let info = &data.file_info;
    format!(
        "{:06o} {:>6}:{:<6} {:>10}  ",
        info.mode, info.uid, info.gid, info.size
    )
}
