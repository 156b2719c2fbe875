//! Integration tests for the wiki2docbook conversion pipeline.
//!
//! Each test lays out a small wiki tree in a `TempDir`, runs the library pipeline end
//! to end and inspects the DocBook files it writes. Tests are organized into sections:
//!
//! - **End-to-end Tests** -- Output files, structural elements, inclusion directives
//! - **Rendering Tests** -- Wiki markup surviving the HTML and DocBook passes
//! - **Failure Tests** -- Missing pages, missing output directory, malformed index
//!
//! # Sample Data
//!
//! `sample_wiki()` describes a guide with two chapters, the second holding one section:
//! - GuideIndex (book) -> GuideIntro, GuideUsage (chapters)
//! - GuideUsage -> GuideUsageOptions (section)

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiki2docbook::config::BuildConfig;
use wiki2docbook::pipeline;

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";

fn include(page: &str) -> String {
    format!("<xi:include xmlns:xi=\"http://www.w3.org/2001/XInclude\" href=\"{page}.xml\"/>")
}

fn sample_wiki() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "GuideIndex",
            "= The Guide =\n\
             \n\
             \x20 * [wiki:GuideIntro]\n\
             \x20 * [wiki:GuideUsage]\n\
             \x20   * [wiki:GuideUsageOptions]\n",
        ),
        (
            "GuideIntro",
            "= Introduction =\n\
             \n\
             This guide is '''short'''.\n\
             \n\
             == Installing ==\n\
             Run {{{make install}}}, then read GuideUsage.\n",
        ),
        (
            "GuideUsage",
            "Pick a topic:\n\
             \n\
             \x20 * [wiki:GuideUsageOptions]\n",
        ),
        (
            "GuideUsageOptions",
            "||= Option =||= Meaning =||\n\
             || -v || more output ||\n\
             \n\
             {{{\n\
             wiki2docbook -v\n\
             }}}\n",
        ),
    ]
}

/// Writes `pages` under `<root>/wiki` and creates an empty `<root>/docbook`.
fn setup(pages: &[(&str, &str)]) -> (TempDir, BuildConfig) {
    let root = TempDir::new().unwrap();
    let wiki_dir = root.path().join("wiki");
    let output_dir = root.path().join("docbook");
    fs::create_dir(&wiki_dir).unwrap();
    fs::create_dir(&output_dir).unwrap();
    for (name, text) in pages {
        fs::write(wiki_dir.join(name), text).unwrap();
    }
    let config = BuildConfig {
        wiki_dir,
        output_dir,
        ..BuildConfig::default()
    };
    (root, config)
}

fn read_output(config: &BuildConfig, page: &str) -> String {
    fs::read_to_string(config.output_dir.join(format!("{page}.xml"))).unwrap()
}

fn output_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ---------------------------------------------------------------------------
// End-to-end tests
// ---------------------------------------------------------------------------

#[test]
fn single_chapter_book() {
    let (_root, config) = setup(&[("GuideIndex", "  * [wiki:GuideA]\n"), ("GuideA", "Hello")]);
    let summary = pipeline::run(&config).unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.includes, 1);
    assert_eq!(
        read_output(&config, "GuideIndex"),
        format!("{XML_DECL}<book id=\"GuideIndex\">\n{}\n</book>\n", include("GuideA"))
    );
    assert_eq!(
        read_output(&config, "GuideA"),
        format!("{XML_DECL}<chapter id=\"GuideA\">\n<para>Hello</para>\n</chapter>\n")
    );
}

#[test]
fn unindented_index_bullet_is_a_chapter() {
    let (_root, config) = setup(&[("GuideIndex", "* [wiki:GuideA]"), ("GuideA", "Hello")]);
    let summary = pipeline::run(&config).unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.includes, 1);
    assert_eq!(
        read_output(&config, "GuideIndex"),
        format!("{XML_DECL}<book id=\"GuideIndex\">\n{}\n</book>\n", include("GuideA"))
    );
    assert_eq!(
        read_output(&config, "GuideA"),
        format!("{XML_DECL}<chapter id=\"GuideA\">\n<para>Hello</para>\n</chapter>\n")
    );
}

#[test]
fn unindented_index_tree() {
    let (_root, config) = setup(&[
        ("GuideIndex", "* [wiki:GuideA]\n  * [wiki:GuideA1]\n* [wiki:GuideB]\n"),
        ("GuideA", "* [wiki:GuideA1]\n"),
        ("GuideA1", "A1"),
        ("GuideB", "B"),
    ]);
    pipeline::run(&config).unwrap();

    let index = read_output(&config, "GuideIndex");
    assert!(index.contains(&format!("{}\n{}", include("GuideA"), include("GuideB"))));
    assert!(!index.contains("GuideA1"));
    assert!(read_output(&config, "GuideA").contains(&include("GuideA1")));
    assert!(read_output(&config, "GuideA1").contains("<section id=\"GuideA1\">"));
}

#[test]
fn writes_one_file_per_page() {
    let (_root, config) = setup(&sample_wiki());
    let summary = pipeline::run(&config).unwrap();

    assert_eq!(summary.pages, 4);
    assert_eq!(summary.containers, 2);
    assert_eq!(summary.includes, 3);
    assert_eq!(
        output_files(&config.output_dir),
        vec![
            "GuideIndex.xml",
            "GuideIntro.xml",
            "GuideUsage.xml",
            "GuideUsageOptions.xml"
        ]
    );
}

#[test]
fn structural_elements_follow_depth() {
    let (_root, config) = setup(&sample_wiki());
    pipeline::run(&config).unwrap();

    assert!(read_output(&config, "GuideIndex").contains("<book id=\"GuideIndex\">"));
    assert!(read_output(&config, "GuideIntro").contains("<chapter id=\"GuideIntro\">"));
    assert!(read_output(&config, "GuideUsage").contains("<chapter id=\"GuideUsage\">"));
    assert!(read_output(&config, "GuideUsageOptions")
        .contains("<section id=\"GuideUsageOptions\">"));
}

#[test]
fn index_includes_only_direct_children() {
    let (_root, config) = setup(&sample_wiki());
    pipeline::run(&config).unwrap();

    let index = read_output(&config, "GuideIndex");
    assert!(index.contains("<title id=\"TheGuide\">The Guide</title>"));
    let intro = index.find(&include("GuideIntro")).unwrap();
    let usage = index.find(&include("GuideUsage")).unwrap();
    assert!(intro < usage);
    assert!(!index.contains("GuideUsageOptions"));
    assert!(!index.contains("itemizedlist"));
}

#[test]
fn nested_container_includes_its_child() {
    let (_root, config) = setup(&sample_wiki());
    pipeline::run(&config).unwrap();

    let usage = read_output(&config, "GuideUsage");
    assert!(usage.contains("<para>Pick a topic:</para>"));
    assert!(usage.contains(&include("GuideUsageOptions")));
}

#[test]
fn rerun_overwrites_output() {
    let (_root, config) = setup(&[("GuideIndex", "  * [wiki:GuideA]\n"), ("GuideA", "Hello")]);
    fs::write(config.output_dir.join("GuideA.xml"), "stale").unwrap();
    pipeline::run(&config).unwrap();
    pipeline::run(&config).unwrap();
    assert!(read_output(&config, "GuideA").contains("<para>Hello</para>"));
}

// ---------------------------------------------------------------------------
// Rendering tests
// ---------------------------------------------------------------------------

#[test]
fn headings_and_inline_markup() {
    let (_root, config) = setup(&sample_wiki());
    pipeline::run(&config).unwrap();

    let intro = read_output(&config, "GuideIntro");
    assert!(intro.contains("<title id=\"Introduction\">Introduction</title>"));
    assert!(intro.contains("<para>This guide is <emphasis role=\"bold\">short</emphasis>.</para>"));
    assert!(intro.contains("<section id=\"Installing\">\n<title>Installing</title>"));
    assert!(intro.contains("<literal>make install</literal>"));
    assert!(intro.contains("<link linkend=\"GuideUsage\">GuideUsage</link>"));
}

#[test]
fn tables_and_code_blocks() {
    let (_root, config) = setup(&sample_wiki());
    pipeline::run(&config).unwrap();

    let options = read_output(&config, "GuideUsageOptions");
    assert!(options.contains("<tgroup cols=\"2\">"));
    assert!(options.contains("<thead>\n<row>\n<entry>Option</entry>\n<entry>Meaning</entry>"));
    assert!(options.contains("<entry>-v</entry>"));
    assert!(options.contains("<programlisting>wiki2docbook -v</programlisting>"));
}

#[test]
fn cross_page_anchor_links_resolve() {
    let (_root, config) = setup(&[
        ("GuideIndex", "  * [wiki:GuideA]\n  * [wiki:GuideB]\n"),
        ("GuideA", "Intro.\n\n== Setup ==\nSteps.\n\n== Setup ==\nMore.\n"),
        ("GuideB", "See [wiki:GuideA#Setup setup] and [wiki:GuideA#Setup1 again]."),
    ]);
    pipeline::run(&config).unwrap();

    let a = read_output(&config, "GuideA");
    assert!(a.contains("<section id=\"Setup\">\n<title>Setup</title>"));
    assert!(a.contains("<section id=\"Setup1\">\n<title>Setup</title>"));

    let b = read_output(&config, "GuideB");
    assert!(b.contains("<link linkend=\"Setup\">setup</link>"));
    assert!(b.contains("<link linkend=\"Setup1\">again</link>"));
}

#[test]
fn mismatched_heading_markers_are_text() {
    let (_root, config) = setup(&[("GuideIndex", "  * [wiki:GuideA]\n"), ("GuideA", "== Odd ===\n")]);
    pipeline::run(&config).unwrap();
    let a = read_output(&config, "GuideA");
    assert!(a.contains("<para>== Odd ===</para>"));
    assert!(!a.contains("<section"));
}

#[test]
fn leaf_page_keeps_links_as_list() {
    let (_root, config) = setup(&[
        ("GuideIndex", "  * [wiki:GuideA]\n  * [wiki:GuideB]\n"),
        ("GuideA", "See:\n  * [wiki:GuideB]\n"),
        ("GuideB", "B"),
    ]);
    pipeline::run(&config).unwrap();

    let a = read_output(&config, "GuideA");
    assert!(a.contains("<itemizedlist>"));
    assert!(a.contains("<link linkend=\"GuideB\">GuideB</link>"));
    assert!(!a.contains("xi:include"));
}

#[test]
fn special_characters_are_escaped() {
    let (_root, config) = setup(&[
        ("GuideIndex", "  * [wiki:GuideA]\n"),
        ("GuideA", "Use a < b && c > d\n"),
    ]);
    pipeline::run(&config).unwrap();
    assert!(read_output(&config, "GuideA").contains("<para>Use a &lt; b &amp;&amp; c &gt; d</para>"));
}

// ---------------------------------------------------------------------------
// Failure tests
// ---------------------------------------------------------------------------

#[test]
fn missing_child_page_fails() {
    let (_root, config) = setup(&[("GuideIndex", "  * [wiki:GuideMissing]\n")]);
    let err = pipeline::run(&config).unwrap_err();
    assert!(format!("{:#}", err).contains("GuideMissing"));
    assert!(output_files(&config.output_dir).is_empty());
}

#[test]
fn missing_index_fails() {
    let (_root, config) = setup(&[]);
    let err = pipeline::run(&config).unwrap_err();
    assert!(format!("{:#}", err).contains("GuideIndex"));
}

#[test]
fn missing_output_dir_fails_before_writing() {
    let (root, mut config) = setup(&[("GuideIndex", "  * [wiki:GuideA]\n"), ("GuideA", "Hello")]);
    config.output_dir = root.path().join("nowhere");
    let err = pipeline::run(&config).unwrap_err();
    assert!(err.to_string().contains("Output directory not found"));
    assert!(!config.output_dir.exists());
}

#[test]
fn skipped_nesting_level_fails() {
    let (_root, config) = setup(&[
        ("GuideIndex", "  * [wiki:GuideA]\n      * [wiki:GuideB]\n"),
        ("GuideA", "A"),
        ("GuideB", "B"),
    ]);
    let err = pipeline::run(&config).unwrap_err();
    assert!(format!("{:#}", err).contains("without a parent"));
}

#[test]
fn custom_index_page() {
    let (_root, mut config) = setup(&[("GuideBook", "  * [wiki:GuideA]\n"), ("GuideA", "A")]);
    config.index_page = "GuideBook".to_string();
    pipeline::run(&config).unwrap();
    assert!(read_output(&config, "GuideBook").contains("<book id=\"GuideBook\">"));
}
