//! Tree structure rendering for scene hierarchies

use console::Style;
use std::fmt::Write;

/// Represents a node in a rendered tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub node_type: NodeType,
    pub children: Vec<TreeNode>,
    /// Key/value annotations, rendered in insertion order
    pub metadata: Vec<(String, String)>,
    /// Texture files referenced by this node
    pub textures: Vec<String>,
}

/// Types of nodes in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Scene,
    Node,
    Mesh,
    Material,
    Group,
    Pose,
}

/// Options for tree rendering
#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub max_depth: Option<usize>,
    pub show_textures: bool,
    pub no_color: bool,
    pub show_metadata: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            show_textures: true,
            no_color: false,
            show_metadata: true,
        }
    }
}

impl TreeNode {
    /// Create a new tree node
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            children: Vec::new(),
            metadata: Vec::new(),
            textures: Vec::new(),
        }
    }

    /// Add a child node
    pub fn add_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_texture(mut self, path: &str) -> Self {
        self.textures.push(path.to_string());
        self
    }
}

impl NodeType {
    /// Get emoji icon for node type
    pub fn icon(self) -> &'static str {
        match self {
            Self::Scene => "🎬",
            Self::Node => "📍",
            Self::Mesh => "🔺",
            Self::Material => "🎨",
            Self::Group => "📁",
            Self::Pose => "🦴",
        }
    }

    /// Get color style for node type
    pub fn style(self, no_color: bool) -> Style {
        if no_color {
            Style::new()
        } else {
            match self {
                Self::Scene => Style::new().bold().cyan(),
                Self::Node => Style::new().green(),
                Self::Mesh => Style::new().bold().yellow(),
                Self::Material => Style::new().magenta(),
                Self::Group => Style::new().cyan(),
                Self::Pose => Style::new().blue(),
            }
        }
    }
}

/// Render a tree structure to string
pub fn render_tree(root: &TreeNode, options: &TreeOptions) -> String {
    let mut output = String::new();
    render_node(root, &mut output, "", true, 0, options);
    output
}

/// Render a single node and its children
fn render_node(
    node: &TreeNode,
    output: &mut String,
    prefix: &str,
    is_last: bool,
    depth: usize,
    options: &TreeOptions,
) {
    if let Some(max_depth) = options.max_depth
        && depth > max_depth
    {
        return;
    }

    let connector = if depth == 0 {
        ""
    } else if is_last {
        "└── "
    } else {
        "├── "
    };
    let style = node.node_type.style(options.no_color);
    let _ = writeln!(
        output,
        "{prefix}{connector}{} {}",
        node.node_type.icon(),
        style.apply_to(&node.name)
    );

    let child_prefix = if depth == 0 {
        String::new()
    } else {
        format!("{}{}", prefix, if is_last { "    " } else { "│   " })
    };

    if options.show_metadata {
        let meta_style = if options.no_color {
            Style::new()
        } else {
            Style::new().dim()
        };
        for (key, value) in &node.metadata {
            let _ = writeln!(
                output,
                "{child_prefix}    🏷️  {}: {value}",
                meta_style.apply_to(key)
            );
        }
    }

    if options.show_textures {
        let texture_style = if options.no_color {
            Style::new()
        } else {
            Style::new().yellow()
        };
        for texture in &node.textures {
            let _ = writeln!(
                output,
                "{child_prefix}    └─→ 🖼️ {}",
                texture_style.apply_to(texture)
            );
        }
    }

    for (i, child) in node.children.iter().enumerate() {
        let is_last_child = i == node.children.len() - 1;
        render_node(
            child,
            output,
            &child_prefix,
            is_last_child,
            depth + 1,
            options,
        );
    }
}
