/*!
 * Tests for export rendering and file naming
 */

use novellama::database::{ChapterRecord, NovelRecord};
use novellama::export::{NovelExport, export_filename, render_export, write_export};

use crate::common;

#[test]
fn test_exportFilename_withPlainAscii_shouldKeepTitle() {
    assert_eq!(export_filename("Overlord"), "Overlord.txt");
    assert_eq!(export_filename("Vol 1/2"), "Vol_1_2.txt");
}

#[test]
fn test_renderExport_shouldListChaptersInGivenOrder() {
    let novel = NovelRecord::new("Tale", "ja", "en");
    let chapters: Vec<ChapterRecord> = (1..=3)
        .map(|n| {
            let mut chapter = ChapterRecord::new(&novel.id, n, &format!("Part {}", n), "src");
            chapter.translated_text = format!("text {}", n);
            chapter
        })
        .collect();

    let content = render_export(&novel, &chapters);

    assert!(content.starts_with("# Novel: Tale\nSource: ja  Target: en\nChapters: 3\n\n"));
    let first = content.find("## Chapter 1: Part 1").unwrap();
    let third = content.find("## Chapter 3: Part 3").unwrap();
    assert!(first < third);
    assert!(content.ends_with("### Translation\n\ntext 3\n"));
}

#[test]
fn test_writeExport_shouldCreateDirectoryAndFile() {
    let temp_dir = common::create_temp_dir().unwrap();
    let export = NovelExport {
        filename: "Tale.txt".to_string(),
        content: "# Novel: Tale\n".to_string(),
        chapter_count: 0,
    };

    let path = write_export(&temp_dir.path().join("out"), &export).unwrap();

    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("Tale.txt"));
    assert_eq!(std::fs::read_to_string(path).unwrap(), "# Novel: Tale\n");
}
