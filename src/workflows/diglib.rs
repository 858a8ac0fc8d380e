//! Digital library migration: MAB exports to a MARC21 record hierarchy
//!
//! The export is a tree of XML files, one per node, named by node id in a
//! single ids directory. Files of a node live below the directory of its
//! parent level. Only the root states file access; descendants inherit it.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde_json::json;

use crate::{
    convert::{Convert, Element},
    converters::{MabContext, MabToMarc21},
    error::{AppError, AppResult},
    marc::Marc21Metadata,
    models::{AccessLevel, Identity},
    services::Services,
};

/// Where the export lies on disk
#[derive(Debug, Clone)]
pub struct DiglibLayout {
    /// Root of the file tree
    pub directory_files: PathBuf,
    /// Directory holding `{id}.xml` for every node
    pub directory_ids: PathBuf,
}

struct Node {
    input_file: PathBuf,
    directory_files: PathBuf,
    root_id: Option<String>,
    parent_id: Option<String>,
    publisher: String,
    file_access: AccessLevel,
}

type NodeFuture<'a> = Pin<Box<dyn Future<Output = AppResult<String>> + Send + 'a>>;

/// Import the hierarchy rooted at `input_file`; returns the root record id
///
/// Every node is created as a draft, its children are imported, then the
/// node is published, so a parent is published only after its subtree.
pub async fn import_tree(
    services: &Services,
    identity: &Identity,
    layout: &DiglibLayout,
    input_file: &Path,
) -> AppResult<String> {
    let node = Node {
        input_file: input_file.to_path_buf(),
        directory_files: layout.directory_files.clone(),
        root_id: None,
        parent_id: None,
        publisher: String::new(),
        file_access: AccessLevel::Restricted,
    };
    let id = import_node(services, identity, &layout.directory_ids, node).await?;
    tracing::info!("{} successfully imported to record: {}", input_file.display(), id);
    Ok(id)
}

fn import_node<'a>(
    services: &'a Services,
    identity: &'a Identity,
    directory_ids: &'a Path,
    node: Node,
) -> NodeFuture<'a> {
    Box::pin(async move {
        let source = read_export(&node.input_file).await?;

        let mut marc = Marc21Metadata::new();
        let ctx = MabToMarc21::convert_with(&source, MabContext::with_publisher(node.publisher), &mut marc)
            .map_err(|e| {
                tracing::warn!("conversion of {} failed", node.input_file.display());
                e
            })?;

        let level_directory = if ctx.directory_name.is_empty() {
            node.directory_files.clone()
        } else {
            node.directory_files.join(&ctx.directory_name)
        };

        let mut files = Vec::new();
        if !ctx.filename.is_empty() {
            let base = if ctx.resource_type == "issue" {
                &node.directory_files
            } else {
                &level_directory
            };
            let path = base.join(format!("{}.pdf", ctx.filename));
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(AppError::MissingAsset {
                    id: node.input_file.display().to_string(),
                    message: format!("file {} does not exist", path.display()),
                });
            }
            files.push(path);
        }

        let file_access = ctx.access.unwrap_or(node.file_access);

        let mut data = marc.json();
        data["files"] = json!({"enabled": !files.is_empty()});
        data["access"] = json!({"files": file_access.as_str(), "record": AccessLevel::Public.as_str()});
        data["catalogue"] = json!({
            "root": node.root_id.clone().unwrap_or_default(),
            "parent": node.parent_id.unwrap_or_default(),
            "children": [],
        });

        let draft = services.marc21.create(identity, data, files, false).await?;
        let root_id = node.root_id.unwrap_or_else(|| draft.id.clone());

        for child_id in &ctx.children_ids {
            let child = Node {
                input_file: directory_ids.join(format!("{}.xml", child_id)),
                directory_files: level_directory.clone(),
                root_id: Some(root_id.clone()),
                parent_id: Some(draft.id.clone()),
                publisher: ctx.publisher.clone(),
                file_access,
            };
            import_node(services, identity, directory_ids, child).await?;
        }

        let record = services.marc21.publish(identity, &draft.id).await?;
        tracing::debug!("Node {} published as {}", node.input_file.display(), record.id);
        Ok(record.id)
    })
}

async fn read_export(path: &Path) -> AppResult<Element> {
    let xml = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::MissingAsset {
            id: path.display().to_string(),
            message: e.to_string(),
        })?;
    Ok(Element::parse(&xml)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    fn export(fields: &[(&str, &str)]) -> String {
        let body: String = fields
            .iter()
            .map(|(code, value)| {
                format!(
                    r#"<fie><fien val="{}"/><ind val=" "/><subf subfn="a" subfv="{}"/></fie>"#,
                    code, value
                )
            })
            .collect();
        format!("<record><info>{}</info></record>", body)
    }

    fn layout(root: &Path) -> DiglibLayout {
        let layout = DiglibLayout {
            directory_files: root.join("files"),
            directory_ids: root.join("ids"),
        };
        std::fs::create_dir_all(layout.directory_files.join("report")).unwrap();
        std::fs::create_dir_all(&layout.directory_ids).unwrap();
        layout
    }

    fn write_root(layout: &DiglibLayout) -> PathBuf {
        let path = layout.directory_ids.join("ubtug-1.xml");
        let xml = export(&[
            ("001", "ubtug-1"),
            ("331", "Annual Report"),
            ("425", "1925"),
            ("1050", "ubtug-2"),
            ("1100", "openaccess"),
            ("1102", "book"),
            ("1105", "report"),
            ("1504", "Verlag der TH"),
        ]);
        std::fs::write(&path, xml).unwrap();
        path
    }

    fn write_chapter(layout: &DiglibLayout) {
        let xml = export(&[
            ("001", "ubtug-2"),
            ("331", "Chapter One"),
            ("1100", "N/A"),
            ("1102", "chapter"),
            ("1200", "chapter-1"),
        ]);
        std::fs::write(layout.directory_ids.join("ubtug-2.xml"), xml).unwrap();
    }

    #[tokio::test]
    async fn test_children_inherit_access_and_hierarchy() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path());
        let input = write_root(&layout);
        write_chapter(&layout);
        let pdf = layout.directory_files.join("report").join("chapter-1.pdf");
        std::fs::write(&pdf, b"%PDF").unwrap();

        let harness = Fixture::new().build().await;
        let root_id = import_tree(&harness.services, &Identity::system(), &layout, &input)
            .await
            .unwrap();
        assert_eq!(root_id, "rec-1");

        let root = harness.marc21.record("rec-1").unwrap();
        assert_eq!(root["files"]["enabled"], false);
        assert_eq!(root["access"]["files"], "public");
        assert_eq!(root["catalogue"]["root"], "");

        let child = harness.marc21.record("rec-2").unwrap();
        assert_eq!(child["access"]["files"], "public");
        assert_eq!(child["catalogue"]["root"], "rec-1");
        assert_eq!(child["catalogue"]["parent"], "rec-1");
        assert_eq!(harness.marc21.files("rec-2"), vec![pdf]);
    }

    #[tokio::test]
    async fn test_missing_pdf_stops_the_import() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path());
        let input = write_root(&layout);
        write_chapter(&layout);

        let harness = Fixture::new().build().await;
        let err = import_tree(&harness.services, &Identity::system(), &layout, &input)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingAsset { ref message, .. } if message.contains("chapter-1.pdf")));
        assert!(harness.marc21.record("rec-1").is_none());
    }
}
