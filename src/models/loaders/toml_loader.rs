use crate::error::{AppError, AppResult, FileError};
use crate::models::startup::StartupInput;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 输入文件结构：一个 `[[startups]]` 数组
#[derive(Debug, Deserialize)]
struct StartupFile {
    #[serde(default)]
    startups: Vec<StartupInput>,
}

/// 从 TOML 文件加载创业公司输入
pub async fn load_startup_file(toml_file_path: &Path) -> AppResult<Vec<StartupInput>> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(toml_file_path.display().to_string(), e))?;

    let file: StartupFile = toml::from_str(&content).map_err(|e| {
        AppError::File(FileError::TomlParseFailed {
            path: toml_file_path.display().to_string(),
            source: Box::new(e),
        })
    })?;

    Ok(file.startups)
}

/// 从文件夹中加载所有 TOML 文件，按文件名排序后拼接
///
/// 单个文件加载失败只记录警告并跳过
pub async fn load_all_startup_files(folder_path: &str) -> AppResult<Vec<StartupInput>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }
        .into());
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::file_read_failed(folder_path, e))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut inputs = Vec::new();
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_startup_file(&path).await {
            Ok(startups) => {
                tracing::info!("成功加载 {} 家公司", startups.len());
                inputs.extend(startups);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_all_startup_files_skips_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.toml"),
            r#"
[[startups]]
name = "Acme"
website = "https://acme.io"
sector = "Fintech"

[[startups]]
name = "Globex"
pitchDeckUrl = "https://globex.io/deck.pdf"
existingCompetitors = ["Initech"]
"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("b.toml"), "[[startups]\nname = ").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let inputs = load_all_startup_files(dir.path().to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].name, "Acme");
        assert_eq!(inputs[1].existing_competitors, vec!["Initech".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_folder_is_an_error() {
        let result = load_all_startup_files("/definitely/not/here").await;
        assert!(matches!(
            result,
            Err(AppError::File(FileError::DirectoryNotFound { .. }))
        ));
    }
}
