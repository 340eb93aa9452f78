//! Detection and removal of stale NuGet references in MSBuild project files.
//!
//! The file is loaded into an arena of nodes built from `quick-xml` events.
//! Every node keeps the raw event it was read from, so writing the tree back
//! reproduces untouched content byte-for-byte; only removed subtrees (and the
//! indentation in front of them) disappear.

use crate::error::{RepairError, Result};
use crate::rules::Rules;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Index of a node inside a [`ProjectDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        start: BytesStart<'static>,
        /// `None` for self-closing elements.
        end: Option<BytesEnd<'static>>,
    },
    /// Text, comments, declarations and anything else that is not an element.
    Leaf(Event<'static>),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed project file.
#[derive(Debug, Clone)]
pub struct ProjectDocument {
    bom: bool,
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

/// Result of [`ProjectDocument::inspect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub offending: Vec<NodeId>,
}

impl Inspection {
    pub fn is_valid(&self) -> bool {
        self.offending.is_empty()
    }
}

impl ProjectDocument {
    /// Parse project markup. `origin` is only used for error messages.
    pub fn parse(bytes: &[u8], origin: &Path) -> Result<Self> {
        let (bom, body) = match bytes.strip_prefix(UTF8_BOM) {
            Some(rest) => (true, rest),
            None => (false, bytes),
        };
        let text = std::str::from_utf8(body)
            .map_err(|e| RepairError::parse(origin, format!("not valid UTF-8: {e}")))?;

        let mut doc = ProjectDocument {
            bom,
            nodes: Vec::new(),
            roots: Vec::new(),
        };
        let mut open: Vec<NodeId> = Vec::new();
        let mut root_elements = 0usize;

        let mut reader = Reader::from_str(text);
        loop {
            let event = reader.read_event().map_err(|e| {
                RepairError::parse(
                    origin,
                    format!("{e} at position {}", reader.buffer_position()),
                )
            })?;

            match event {
                Event::Start(start) => {
                    check_attributes(&start, origin)?;
                    if open.is_empty() {
                        root_elements += 1;
                    }
                    let id = doc.push(
                        NodeKind::Element {
                            start: start.into_owned(),
                            end: None,
                        },
                        open.last().copied(),
                    );
                    open.push(id);
                }
                Event::Empty(start) => {
                    check_attributes(&start, origin)?;
                    if open.is_empty() {
                        root_elements += 1;
                    }
                    doc.push(
                        NodeKind::Element {
                            start: start.into_owned(),
                            end: None,
                        },
                        open.last().copied(),
                    );
                }
                Event::End(end) => {
                    let id = open.pop().ok_or_else(|| {
                        RepairError::parse(origin, "closing tag without matching opening tag")
                    })?;
                    if let NodeKind::Element { end: slot, .. } = &mut doc.nodes[id.0].kind {
                        *slot = Some(end.into_owned());
                    }
                }
                Event::Eof => break,
                Event::Text(ref text)
                    if open.is_empty() && !text.iter().all(u8::is_ascii_whitespace) =>
                {
                    return Err(RepairError::parse(origin, "text outside the root element"));
                }
                other => {
                    doc.push(NodeKind::Leaf(other.into_owned()), open.last().copied());
                }
            }
        }

        if let Some(id) = open.last() {
            return Err(RepairError::parse(
                origin,
                format!("element <{}> is never closed", doc.element_name(*id)),
            ));
        }
        match root_elements {
            0 => Err(RepairError::parse(origin, "no root element")),
            1 => Ok(doc),
            _ => Err(RepairError::parse(origin, "more than one root element")),
        }
    }

    /// Read and parse a project file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| RepairError::io(path, e))?;
        Self::parse(&bytes, path)
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Local name of an element node, empty for anything else.
    pub fn element_name(&self, id: NodeId) -> String {
        match &self.nodes[id.0].kind {
            NodeKind::Element { start, .. } => {
                String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
            }
            NodeKind::Leaf(_) => String::new(),
        }
    }

    /// Short human-readable form of a node, e.g. `<Import Project="...">`.
    pub fn describe(&self, id: NodeId) -> String {
        match &self.nodes[id.0].kind {
            NodeKind::Element { start, .. } => {
                format!("<{}>", String::from_utf8_lossy(start).trim())
            }
            NodeKind::Leaf(_) => String::from("#text"),
        }
    }

    /// Walk all descendants once and collect elements matching an offending
    /// pattern, in document order.
    pub fn inspect(&self, rules: &Rules) -> Inspection {
        let mut offending = Vec::new();
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            if self.is_offending(id, rules) {
                offending.push(id);
            }
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }

        Inspection { offending }
    }

    fn is_offending(&self, id: NodeId, rules: &Rules) -> bool {
        let NodeKind::Element { start, .. } = &self.nodes[id.0].kind else {
            return false;
        };
        let element = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

        start.attributes().flatten().any(|attr| {
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            match attr.unescape_value() {
                Ok(value) => rules.is_offending(&element, &key, &value),
                Err(_) => false,
            }
        })
    }

    /// Detach the given nodes with their subtrees. Sibling order and all other
    /// content stay as they were.
    pub fn repair(&mut self, offending: &[NodeId]) {
        for &id in offending {
            let parent = self.nodes[id.0].parent;
            let siblings = match parent {
                Some(p) => &mut self.nodes[p.0].children,
                None => &mut self.roots,
            };
            let Some(pos) = siblings.iter().position(|&s| s == id) else {
                continue;
            };
            siblings.remove(pos);

            // Take the indentation in front of the element along with it.
            if pos > 0 {
                let prev = siblings[pos - 1];
                if is_indentation(&self.nodes[prev.0].kind) {
                    let siblings = match parent {
                        Some(p) => &mut self.nodes[p.0].children,
                        None => &mut self.roots,
                    };
                    siblings.remove(pos - 1);
                }
            }
        }
    }

    /// Serialize the tree back to bytes.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        if self.bom {
            out.extend_from_slice(UTF8_BOM);
        }
        let mut writer = Writer::new(out);
        for &id in &self.roots {
            self.write_node(&mut writer, id)?;
        }
        Ok(writer.into_inner())
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> io::Result<()> {
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Leaf(event) => write_event(writer, event.clone()),
            NodeKind::Element { start, end: None } => {
                write_event(writer, Event::Empty(start.clone()))
            }
            NodeKind::Element {
                start,
                end: Some(end),
            } => {
                write_event(writer, Event::Start(start.clone()))?;
                for &child in &node.children {
                    self.write_node(writer, child)?;
                }
                write_event(writer, Event::End(end.clone()))
            }
        }
    }

    /// Overwrite `path` with the serialized tree.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes().map_err(|e| RepairError::io(path, e))?;
        fs::write(path, bytes).map_err(|e| RepairError::io(path, e))
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> io::Result<()> {
    writer.write_event(event).map_err(io::Error::other)
}

fn check_attributes(start: &BytesStart<'_>, origin: &Path) -> Result<()> {
    for attr in start.attributes() {
        attr.map_err(|e| RepairError::parse(origin, format!("bad attribute: {e}")))?;
    }
    Ok(())
}

fn is_indentation(kind: &NodeKind) -> bool {
    match kind {
        NodeKind::Leaf(Event::Text(text)) => {
            !text.is_empty() && text.iter().all(u8::is_ascii_whitespace)
        }
        _ => false,
    }
}

/// Per-file classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectVerdict {
    Valid,
    Invalid {
        /// Descriptions of the offending elements.
        offending: Vec<String>,
        repaired: bool,
    },
}

/// Inspect one project file and, when `apply` is set, repair it in place.
pub fn inspect_file(path: &Path, rules: &Rules, apply: bool) -> Result<ProjectVerdict> {
    let mut doc = ProjectDocument::load(path)?;
    let inspection = doc.inspect(rules);
    if inspection.is_valid() {
        return Ok(ProjectVerdict::Valid);
    }

    let offending = inspection
        .offending
        .iter()
        .map(|&id| doc.describe(id))
        .collect();

    if apply {
        doc.repair(&inspection.offending);
        doc.save(path)?;
        debug!("Repaired {}", path.display());
    }

    Ok(ProjectVerdict::Invalid {
        offending,
        repaired: apply,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const LEGACY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="12.0" DefaultTargets="Build" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <RestorePackages>true</RestorePackages>
  </PropertyGroup>
  <Import Project="$(MSBuildToolsPath)\Microsoft.CSharp.targets" />
  <Import Project="$(SolutionDir)\.nuget\NuGet.targets" Condition="Exists('$(SolutionDir)\.nuget\NuGet.targets')" />
  <Target Name="EnsureNuGetPackageBuildImports" BeforeTargets="PrepareForBuild">
    <Error Condition="!Exists('$(SolutionDir)\.nuget\NuGet.targets')" Text="missing" />
  </Target>
</Project>
"#;

    const CLEANED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="12.0" DefaultTargets="Build" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <RestorePackages>true</RestorePackages>
  </PropertyGroup>
  <Import Project="$(MSBuildToolsPath)\Microsoft.CSharp.targets" />
</Project>
"#;

    fn rules() -> Rules {
        Rules::load().unwrap()
    }

    fn parse(text: &str) -> ProjectDocument {
        ProjectDocument::parse(text.as_bytes(), Path::new("App.csproj")).unwrap()
    }

    #[test]
    fn finds_both_patterns() {
        let doc = parse(LEGACY);
        let inspection = doc.inspect(&rules());
        assert!(!inspection.is_valid());
        let names: Vec<_> = inspection
            .offending
            .iter()
            .map(|&id| doc.element_name(id))
            .collect();
        assert_eq!(names, vec!["Import", "Target"]);
    }

    #[test]
    fn repair_removes_subtrees_and_indentation() {
        let mut doc = parse(LEGACY);
        let inspection = doc.inspect(&rules());
        doc.repair(&inspection.offending);

        assert!(doc.inspect(&rules()).is_valid());
        let bytes = doc.to_bytes().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), CLEANED);
    }

    #[test]
    fn single_import_becomes_valid_after_repair() {
        let mut doc = parse(r#"<Project><Import Project="packages\nuget.targets"/></Project>"#);
        let inspection = doc.inspect(&rules());
        assert_eq!(inspection.offending.len(), 1);

        doc.repair(&inspection.offending);
        let after = doc.inspect(&rules());
        assert!(after.is_valid());
        assert!(after.offending.is_empty());
        assert_eq!(doc.to_bytes().unwrap(), b"<Project></Project>");
    }

    #[test]
    fn clean_document_round_trips_unchanged() {
        let mut doc = parse(CLEANED);
        let inspection = doc.inspect(&rules());
        assert!(inspection.is_valid());

        doc.repair(&inspection.offending);
        assert_eq!(doc.to_bytes().unwrap(), CLEANED.as_bytes());
    }

    #[test]
    fn comments_entities_and_bom_survive() {
        let text = "\u{feff}<Project>\r\n  <!-- keep &amp; me -->\r\n  <PropertyGroup Label=\"a &amp; b\"><X>1 &lt; 2</X></PropertyGroup>\r\n  <Target Name=\"NuGetRestore\"><Exec Command=\"x\"/></Target>\r\n</Project>";
        let mut doc = parse(text);
        let inspection = doc.inspect(&rules());
        doc.repair(&inspection.offending);
        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert_eq!(
            out,
            "\u{feff}<Project>\r\n  <!-- keep &amp; me -->\r\n  <PropertyGroup Label=\"a &amp; b\"><X>1 &lt; 2</X></PropertyGroup>\r\n</Project>"
        );
    }

    #[test]
    fn element_and_attribute_names_match_case_insensitively() {
        let doc = parse(r#"<project><import project="..\NUGET.TARGETS"/><target name="AfterBuild"/></project>"#);
        let inspection = doc.inspect(&rules());
        assert_eq!(inspection.offending.len(), 1);
        assert_eq!(doc.element_name(inspection.offending[0]), "import");
    }

    #[test]
    fn namespaced_names_use_local_part() {
        let doc = parse(
            r#"<msb:Project xmlns:msb="urn:x"><msb:Import msb:Project="NuGet.targets"/></msb:Project>"#,
        );
        assert_eq!(doc.inspect(&rules()).offending.len(), 1);
    }

    #[test]
    fn malformed_markup_is_a_parse_error() {
        for bad in [
            "<Project><PropertyGroup></Project>",
            "<Project>",
            "",
            "just text",
            "<A/><B/>",
            "<Project a=\"1\" a=\"2\"/>",
        ] {
            let err = ProjectDocument::parse(bad.as_bytes(), Path::new("Bad.csproj")).unwrap_err();
            assert!(matches!(err, RepairError::Parse { .. }), "{bad:?} -> {err}");
        }
    }

    #[test]
    fn inspect_file_only_writes_when_applied() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("App.csproj");
        fs::write(&path, LEGACY).unwrap();

        let verdict = inspect_file(&path, &rules(), false).unwrap();
        assert!(matches!(
            verdict,
            ProjectVerdict::Invalid { ref offending, repaired: false } if offending.len() == 2
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), LEGACY);

        inspect_file(&path, &rules(), true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), CLEANED);
        assert_eq!(
            inspect_file(&path, &rules(), true).unwrap(),
            ProjectVerdict::Valid
        );
    }
}
