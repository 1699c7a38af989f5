use cardpress::{CompileMode, FilePhotoSource, NodeKind, Subject, Template, compile, extract_fields};

const TEMPLATE: &str = r##"{
  "name": "staff badge",
  "cardWidthPx": 638,
  "cardHeightPx": 1011,
  "frontDesign": {
    "width": 638,
    "height": 1011,
    "backgroundColor": "#FFFFFF",
    "objects": [
      {"type": "rect", "left": 0, "top": 0, "width": 638, "height": 180, "fill": "#1D4ED8"},
      {"type": "circle", "left": 319, "top": 380, "originX": "center", "originY": "center",
       "radius": 130, "fill": "#E5E7EB", "data": {"isPhotoSlot": true, "isCircular": true}},
      {"type": "text", "left": 319, "top": 580, "originX": "center",
       "text": "{{name}}", "fontSize": 42, "fill": "#111827"},
      {"type": "text", "left": 319, "top": 640, "originX": "center",
       "text": "roll", "fontSize": 28, "fill": "#374151", "data": {"key": "roll_number"}}
    ]
  }
}"##;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let template: Template = serde_json::from_str(TEMPLATE)?;
    let raw: serde_json::Value = serde_json::from_str(TEMPLATE)?;

    let keys: Vec<String> = extract_fields(&raw["frontDesign"]).into_iter().collect();
    println!("bound fields: {}", keys.join(", "));

    let Some(front) = &template.front_design else {
        anyhow::bail!("template has no front design");
    };

    let mut subject = Subject::new();
    subject.set("name", "Priya Sharma").set("roll_number", "2031");

    let photos = FilePhotoSource::new(".");
    let compiled = compile(front, &subject, &photos, CompileMode::Batch)?;

    for node in &compiled.scene().nodes {
        if let NodeKind::Text(text) = &node.kind {
            println!("text: {}", text.text);
        }
    }

    Ok(())
}
