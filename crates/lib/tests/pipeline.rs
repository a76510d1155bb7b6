//! End-to-end builds of small application trees.

use std::io::Read;
use std::path::Path;

use antbuild_lib::consts::MANIFEST_FILE;
use antbuild_lib::{BuildError, BuildOptions, build};
use tempfile::TempDir;
use tracing_test::traced_test;

fn write(root: &Path, rel: &str, content: &str) {
  let path = root.join(rel);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, content).unwrap();
}

fn manifest(head: &str, body: &str) -> String {
  format!(
    "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Application>\n\t<Head>\n\t\t<meta name=\"id\" value=\"demo\"/>\n\t\t<meta name=\"title\" value=\"Demo\" version=\"1.0.0\"/>\n\t\t<meta name=\"author\" value=\"Jane\" namespace=\"acme\"/>\n{head}\t</Head>\n{body}</Application>"
  )
}

struct App {
  src: TempDir,
  out: TempDir,
}

impl App {
  fn new(head: &str, body: &str) -> Self {
    let src = TempDir::new().unwrap();
    write(src.path(), MANIFEST_FILE, &manifest(head, body));
    Self {
      src,
      out: TempDir::new().unwrap(),
    }
  }

  fn write(&self, rel: &str, content: &str) -> &Self {
    write(self.src.path(), rel, content);
    self
  }

  fn dest(&self) -> std::path::PathBuf {
    self.out.path().join("dist")
  }

  fn options(&self) -> BuildOptions {
    BuildOptions::new(self.src.path(), self.dest())
  }

  fn index(&self) -> String {
    std::fs::read_to_string(self.dest().join(MANIFEST_FILE)).unwrap()
  }
}

// =============================================================================
// Sections
// =============================================================================

#[tokio::test]
async fn script_inlines_required_file_once() {
  let app = App::new("\t\t<meta name=\"script\" value=\"app.js\"/>\n", "");
  app
    .write("app.js", "require(\"lib.js\");\nstart(lib);\n")
    .write("lib.js", "const lib = \"LIB_BODY\";");

  build(&app.options()).await.unwrap();

  let index = app.index();
  assert_eq!(index.matches("LIB_BODY").count(), 1);
  assert!(!index.contains("require("));
  assert!(index.contains("<script><![CDATA["));
}

#[tokio::test]
async fn omitted_sections_produce_no_blocks() {
  let app = App::new("\t\t<meta name=\"script\" value=\"missing.js\"/>\n", "");

  build(&app.options()).await.unwrap();

  let index = app.index();
  for tag in ["<script>", "<style>", "<DomStore>", "<WindowBody>", "<WindowIcons>"] {
    assert!(!index.contains(tag), "unexpected {tag}");
  }
}

#[tokio::test]
async fn content_stores_and_icons_are_embedded() {
  let app = App::new(
    "\t\t<meta name=\"content\" value=\"content.xml\"/>\n\t\t<meta name=\"icons\" value=\"icons.xml\"/>\n",
    "",
  );
  app
    .write("content.xml", "@store \"stores/main.xml\"\n<View src=\"~/view.png\"/>")
    .write("stores/main.xml", "<item href=\"~/item\"/>")
    .write("icons.xml", "@import \"parts/icon.xml\"")
    .write("parts/icon.xml", "<icon name=\"gear\"/>");

  build(&app.options()).await.unwrap();

  let index = app.index();
  assert!(index.contains("<DomStore><![CDATA[<store src=\"stores/main.xml\"><item href=\"/app/acme/demo/item\"/></store>]]></DomStore>"));
  assert!(index.contains("<View src=\"/app/acme/demo/view.png\"/>"));
  assert!(!index.contains("@store"));
  assert!(index.contains("<WindowIcons><![CDATA[<icon name=\"gear\"/>]]></WindowIcons>"));
}

#[tokio::test]
async fn style_roles_are_scoped_and_flattened() {
  let app = App::new(
    "\t\t<meta name=\"style\" value=\"body.css\" dialog=\"dialog.css\"/>\n",
    "",
  );
  app
    .write("body.css", ".panel { .title { color: red; } }")
    .write("dialog.css", "@keyframes fade { from { opacity: 0; } } .box { animation: fade 1s; }");

  build(&app.options()).await.unwrap();

  let index = app.index();
  assert!(index.contains(r#".acme-window_[data-id="demo"] .window-body_ .panel .title{color:red}"#));
  assert!(index.contains("@keyframes fade-demo"));
  assert!(index.contains("fade-demo 1s"));
}

#[tokio::test]
async fn no_tilde_reference_survives() {
  let app = App::new(
    "\t\t<meta name=\"script\" value=\"app.js\"/>\n\t\t<meta name=\"style\" value=\"app.css\"/>\n",
    "\t<Body>\n\t\t<img src=\"~/logo.svg\"/>\n\t\t<Path>~/docs/readme.txt</Path>\n\t\t<Run>open ~/files/a.txt</Run>\n\t</Body>\n",
  );
  app
    .write("app.js", "fetch(\"~/data.json\");")
    .write("app.css", ".a { background: url(~/bg.png); }");

  build(&app.options()).await.unwrap();

  let index = app.index();
  assert!(!index.contains("~/"), "{index}");
  assert!(index.contains("<Path>/app/acme/demo/docs/readme.txt</Path>"));
  assert!(index.contains("open /app/acme/demo/files/a.txt"));
  assert!(index.contains("/app/acme/demo/data.json"));
  assert!(index.contains("/app/acme/demo/bg.png"));
  assert!(index.contains("/app/acme/demo/logo.svg"));
}

// =============================================================================
// Tasks
// =============================================================================

#[tokio::test]
async fn tasks_run_before_packaging() {
  let app = App::new(
    "",
    "\t<Build>\n\t\t<task source=\"src/worker.js\" destination=\"public/worker.js\" action=\"skip\"/>\n\t</Build>\n",
  );
  app.write("src/worker.js", "postMessage(\"~/w\");");

  build(&app.options()).await.unwrap();
  assert!(!app.dest().join("worker.js").exists(), "skipped without uglify");

  build(&app.options().uglify(true)).await.unwrap();
  let worker = std::fs::read_to_string(app.dest().join("worker.js")).unwrap();
  assert!(worker.contains("/app/acme/demo/w"));
}

#[tokio::test]
async fn missing_task_source_fails() {
  let app = App::new(
    "",
    "\t<Build>\n\t\t<task source=\"src/nope.js\" destination=\"public/nope.js\"/>\n\t</Build>\n",
  );

  let err = build(&app.options()).await.unwrap_err();
  assert!(matches!(err, BuildError::TaskSourceMissing { .. }));
}

// =============================================================================
// Packaging
// =============================================================================

#[tokio::test]
#[traced_test]
async fn missing_credential_rejects_before_writes() {
  let app = App::new(
    "\t\t<meta name=\"oauth\" value=\"auth.json\"/>\n",
    "\t<Build>\n\t\t<task source=\"src/worker.js\" destination=\"public/worker.js\"/>\n\t</Build>\n",
  );
  app.write("src/worker.js", "work();");

  let err = build(&app.options()).await.unwrap_err();
  assert!(err.to_string().contains("auth.json"), "{err}");
  assert!(!app.dest().exists());
  assert!(!app.src.path().join("public/worker.js").exists());
  assert!(!logs_contain("build complete"));
}

#[tokio::test]
#[traced_test]
async fn plain_build_keeps_formatting() {
  let app = App::new("", "");
  app.write("public/icon.svg", "<svg></svg>").write("LICENSE", "MIT");

  let result = build(&app.options()).await.unwrap();

  assert!(!result.uglified);
  assert!(result.container.is_none());
  assert_eq!(result.id, "demo");
  assert_eq!(result.namespace, "acme");
  assert_eq!(result.version.as_deref(), Some("1.0.0"));

  let index = app.index();
  assert!(index.contains('\n'));
  assert!(index.contains('\t'));
  assert!(index.contains("built=\""));
  assert_eq!(result.size, index.len() as u64);
  assert!(app.dest().join("icon.svg").exists());
  assert!(app.dest().join("LICENSE").exists());
  assert!(logs_contain("build complete"));
}

#[tokio::test]
async fn uglified_build_strips_formatting() {
  let app = App::new("", "\t<Body>\n\t\t<Label/>\n\t</Body>\n");

  let result = build(&app.options().uglify(true)).await.unwrap();

  assert!(result.uglified);
  let index = app.index();
  assert!(!index.contains('\n'));
  assert!(!index.contains('\t'));
}

#[tokio::test]
async fn public_assets_are_filtered() {
  let app = App::new("", "");
  app
    .write("public/img/a.png", "png")
    .write("public/styles/site.less", "a{}")
    .write("public/art.psd", "psd");

  let result = build(&app.options()).await.unwrap();

  assert!(app.dest().join("img/a.png").exists());
  assert!(!app.dest().join("styles/site.less").exists());
  assert!(!app.dest().join("art.psd").exists());
  assert!(result.files.iter().all(|f| f.extension().is_none_or(|e| e != "less")));
}

#[tokio::test]
async fn build_include_readmits_excluded_extensions() {
  let app = App::new("\t\t<meta name=\"build\" include=\"psd\"/>\n", "");
  app.write("public/art.psd", "psd");

  build(&app.options()).await.unwrap();
  assert!(app.dest().join("art.psd").exists());
}

#[tokio::test]
async fn compressed_build_writes_container() {
  let app = App::new("\t\t<meta name=\"oauth\" value=\"keys/auth.json\"/>\n", "");
  app
    .write("keys/auth.json", "{}")
    .write("public/icon.svg", "<svg xmlns=\"http://www.w3.org/2000/svg\"><path/></svg>")
    .write("public/img/a.png", "png");

  let result = build(&app.options().compress(true)).await.unwrap();

  let container = result.container.clone().unwrap();
  assert_eq!(container, app.dest().join("demo.app"));
  assert!(!app.dest().join(MANIFEST_FILE).exists());
  assert!(!app.dest().join("img").exists());
  assert!(app.dest().join("icon.svg").exists());
  assert!(app.dest().join("auth.json").exists());

  let icon = std::fs::read_to_string(app.dest().join("icon.svg")).unwrap();
  assert!(icon.contains("<metadata><app namespace=\"acme\" id=\"demo\""));

  let mut archive = zip::ZipArchive::new(std::fs::File::open(&container).unwrap()).unwrap();
  let mut index = String::new();
  archive.by_name(MANIFEST_FILE).unwrap().read_to_string(&mut index).unwrap();
  assert!(index.contains("<Application"));
  assert!(archive.by_name("img/a.png").is_ok());
  assert_eq!(archive.len(), result.files.len());
}

#[tokio::test]
async fn archived_files_match_their_sources() {
  let app = App::new("\t\t<meta name=\"oauth\" value=\"keys/auth.json\"/>\n", "");
  app
    .write("keys/auth.json", "{\"token\": 1}")
    .write("LICENSE", "MIT\n")
    .write("public/icon.svg", "<svg></svg>")
    .write("public/js/lib.js", "lib();\n")
    .write("public/data/nested/table.csv", "a,b\n1,2\n");
  std::fs::write(app.src.path().join("public/img.bin"), [0u8, 159, 146, 150, 255]).unwrap();

  let result = build(&app.options().compress(true)).await.unwrap();
  let container = result.container.unwrap();

  let mut archive = zip::ZipArchive::new(std::fs::File::open(&container).unwrap()).unwrap();
  let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
  names.sort();
  assert_eq!(
    names,
    vec![
      "LICENSE",
      "auth.json",
      "data/nested/table.csv",
      "icon.svg",
      "img.bin",
      "index.xml",
      "js/lib.js"
    ]
  );

  for name in &names {
    let mut archived = Vec::new();
    archive.by_name(name).unwrap().read_to_end(&mut archived).unwrap();
    let source = match name.as_str() {
      "icon.svg" => continue,
      MANIFEST_FILE => {
        assert!(String::from_utf8(archived).unwrap().contains("built=\""));
        continue;
      }
      "LICENSE" => app.src.path().join("LICENSE"),
      "auth.json" => app.src.path().join("keys/auth.json"),
      other => app.src.path().join("public").join(other),
    };
    assert_eq!(archived, std::fs::read(&source).unwrap(), "{name} differs from its source");
  }
}

#[tokio::test]
async fn destination_equal_to_source_is_refused() {
  let app = App::new("", "");
  app.write("app.js", "run();");

  let err = build(&BuildOptions::new(app.src.path(), app.src.path())).await.unwrap_err();
  assert!(err.to_string().contains("destination"), "{err}");
  assert!(app.src.path().join("app.js").exists());
  assert!(app.src.path().join(MANIFEST_FILE).exists());
}

#[tokio::test]
async fn public_index_does_not_replace_assembled_document() {
  let app = App::new("", "");
  app.write("public/index.xml", "STALE");

  let result = build(&app.options()).await.unwrap();

  let index = app.index();
  assert!(index.contains("<Application"));
  assert_eq!(result.size, index.len() as u64);
}

#[tokio::test]
async fn rebuild_replaces_destination() {
  let app = App::new("", "");
  std::fs::create_dir_all(app.dest()).unwrap();
  std::fs::write(app.dest().join("stale.txt"), "old").unwrap();

  build(&app.options()).await.unwrap();
  assert!(!app.dest().join("stale.txt").exists());
  assert!(app.dest().join(MANIFEST_FILE).exists());
}
