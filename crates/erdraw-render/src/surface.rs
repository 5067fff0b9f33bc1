//! Drawable-surface capability set.
//!
//! The painter talks to the host only through [`Surface`]. The wasm bridge
//! implements it over the DOM; [`RetainedSurface`] is an in-memory element
//! tree used for tests and standalone SVG export.

use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurfaceError {
    #[error("unknown element: {0}")]
    UnknownElement(String),
    #[error("surface operation failed: {0}")]
    Backend(String),
}

/// Element lifecycle, attributes, classes and text content.
pub trait Surface {
    type Element: Clone;

    /// The element every scene is painted into.
    fn root(&self) -> Self::Element;

    fn create(&mut self, tag: &str) -> Result<Self::Element, SurfaceError>;
    fn append(&mut self, parent: &Self::Element, child: &Self::Element)
    -> Result<(), SurfaceError>;
    fn remove(&mut self, element: &Self::Element) -> Result<(), SurfaceError>;
    fn clear(&mut self, element: &Self::Element) -> Result<(), SurfaceError>;
    fn find_by_id(&self, id: &str) -> Option<Self::Element>;

    fn set_attribute(
        &mut self,
        element: &Self::Element,
        name: &str,
        value: &str,
    ) -> Result<(), SurfaceError>;
    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

    fn add_class(&mut self, element: &Self::Element, class: &str) -> Result<(), SurfaceError>;
    fn remove_class(&mut self, element: &Self::Element, class: &str)
    -> Result<(), SurfaceError>;

    fn set_text(&mut self, element: &Self::Element, text: &str) -> Result<(), SurfaceError>;
}

/// Handle into a [`RetainedSurface`]. A handle to a removed element stays
/// invalid after its slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    index: usize,
    generation: u32,
}

const ROOT: NodeHandle = NodeHandle {
    index: 0,
    generation: 0,
};

#[derive(Debug, Clone)]
struct RetainedNode {
    tag: String,
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
    text: Option<String>,
    children: Vec<NodeHandle>,
    parent: Option<NodeHandle>,
    alive: bool,
    generation: u32,
}

impl RetainedNode {
    fn new(tag: &str, generation: u32) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: Vec::new(),
            classes: Vec::new(),
            text: None,
            children: Vec::new(),
            parent: None,
            alive: true,
            generation,
        }
    }
}

/// Arena-backed element tree rooted at an `<svg>` element. Slots of removed
/// elements are recycled, so repainting into one surface does not grow it.
#[derive(Debug, Clone)]
pub struct RetainedSurface {
    nodes: Vec<RetainedNode>,
    free: Vec<usize>,
}

impl Default for RetainedSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RetainedSurface {
    pub fn new() -> Self {
        let mut root = RetainedNode::new("svg", ROOT.generation);
        root.attributes
            .push(("xmlns".to_string(), "http://www.w3.org/2000/svg".to_string()));
        Self {
            nodes: vec![root],
            free: Vec::new(),
        }
    }

    fn unknown(h: &NodeHandle) -> SurfaceError {
        SurfaceError::UnknownElement(format!("node {}/{}", h.index, h.generation))
    }

    fn node(&self, h: &NodeHandle) -> Result<&RetainedNode, SurfaceError> {
        self.nodes
            .get(h.index)
            .filter(|n| n.alive && n.generation == h.generation)
            .ok_or_else(|| Self::unknown(h))
    }

    fn node_mut(&mut self, h: &NodeHandle) -> Result<&mut RetainedNode, SurfaceError> {
        self.nodes
            .get_mut(h.index)
            .filter(|n| n.alive && n.generation == h.generation)
            .ok_or_else(|| Self::unknown(h))
    }

    fn kill(&mut self, h: NodeHandle) {
        let Ok(node) = self.node_mut(&h) else {
            return;
        };
        let children = std::mem::take(&mut node.children);
        node.alive = false;
        for child in children {
            self.kill(child);
        }
        self.free.push(h.index);
    }

    /// Tag name of a live element.
    pub fn tag(&self, h: &NodeHandle) -> Option<&str> {
        self.node(h).ok().map(|n| n.tag.as_str())
    }

    pub fn children(&self, h: &NodeHandle) -> Vec<NodeHandle> {
        self.node(h).map(|n| n.children.clone()).unwrap_or_default()
    }

    pub fn has_class(&self, h: &NodeHandle, class: &str) -> bool {
        self.node(h).is_ok_and(|n| n.classes.iter().any(|c| c == class))
    }

    pub fn text(&self, h: &NodeHandle) -> Option<&str> {
        self.node(h).ok().and_then(|n| n.text.as_deref())
    }

    /// Live elements in document order carrying `class`.
    pub fn find_by_class(&self, class: &str) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        self.collect(ROOT, &mut |s, h| {
            if s.has_class(&h, class) {
                out.push(h);
            }
        });
        out
    }

    fn collect(&self, h: NodeHandle, f: &mut impl FnMut(&Self, NodeHandle)) {
        f(self, h);
        for child in self.children(&h) {
            self.collect(child, f);
        }
    }

    /// Serialize the tree as SVG markup.
    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        self.write_node(ROOT, 0, &mut out);
        out
    }

    fn write_node(&self, h: NodeHandle, depth: usize, out: &mut String) {
        let Ok(node) = self.node(&h) else {
            return;
        };
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{indent}<{}", node.tag);
        for (name, value) in &node.attributes {
            let _ = write!(out, " {name}=\"{}\"", escape(value));
        }
        if !node.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&node.classes.join(" ")));
        }
        if node.children.is_empty() && node.text.is_none() {
            out.push_str("/>\n");
            return;
        }
        out.push('>');
        if let Some(text) = &node.text {
            out.push_str(&escape(text));
        }
        if !node.children.is_empty() {
            out.push('\n');
            for child in &node.children {
                self.write_node(*child, depth + 1, out);
            }
            out.push_str(&indent);
        }
        let _ = writeln!(out, "</{}>", node.tag);
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl Surface for RetainedSurface {
    type Element = NodeHandle;

    fn root(&self) -> NodeHandle {
        ROOT
    }

    fn create(&mut self, tag: &str) -> Result<NodeHandle, SurfaceError> {
        if let Some(index) = self.free.pop() {
            let generation = self.nodes[index].generation.wrapping_add(1);
            self.nodes[index] = RetainedNode::new(tag, generation);
            return Ok(NodeHandle { index, generation });
        }
        self.nodes.push(RetainedNode::new(tag, 0));
        Ok(NodeHandle {
            index: self.nodes.len() - 1,
            generation: 0,
        })
    }

    fn append(&mut self, parent: &NodeHandle, child: &NodeHandle) -> Result<(), SurfaceError> {
        let previous = self.node(child)?.parent;
        if let Some(old) = previous {
            self.node_mut(&old)?.children.retain(|c| c != child);
        }
        self.node_mut(parent)?.children.push(*child);
        self.node_mut(child)?.parent = Some(*parent);
        Ok(())
    }

    fn remove(&mut self, element: &NodeHandle) -> Result<(), SurfaceError> {
        let parent = self.node(element)?.parent;
        if let Some(parent) = parent {
            self.node_mut(&parent)?.children.retain(|c| c != element);
        }
        self.kill(*element);
        Ok(())
    }

    fn clear(&mut self, element: &NodeHandle) -> Result<(), SurfaceError> {
        let children = std::mem::take(&mut self.node_mut(element)?.children);
        for child in children {
            self.kill(child);
        }
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> Option<NodeHandle> {
        let mut found = None;
        self.collect(ROOT, &mut |s, h| {
            if found.is_none() && s.attribute(&h, "id").as_deref() == Some(id) {
                found = Some(h);
            }
        });
        found
    }

    fn set_attribute(
        &mut self,
        element: &NodeHandle,
        name: &str,
        value: &str,
    ) -> Result<(), SurfaceError> {
        let node = self.node_mut(element)?;
        match node.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => node.attributes.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn attribute(&self, element: &NodeHandle, name: &str) -> Option<String> {
        let node = self.node(element).ok()?;
        node.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn add_class(&mut self, element: &NodeHandle, class: &str) -> Result<(), SurfaceError> {
        let node = self.node_mut(element)?;
        if !node.classes.iter().any(|c| c == class) {
            node.classes.push(class.to_string());
        }
        Ok(())
    }

    fn remove_class(&mut self, element: &NodeHandle, class: &str) -> Result<(), SurfaceError> {
        self.node_mut(element)?.classes.retain(|c| c != class);
        Ok(())
    }

    fn set_text(&mut self, element: &NodeHandle, text: &str) -> Result<(), SurfaceError> {
        self.node_mut(element)?.text = Some(text.to_string());
        Ok(())
    }
}
