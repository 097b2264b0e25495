use pdf_rewrite::{Document, Object, Value};

fn print_usage(program: &str) {
    eprintln!("Usage: {} <pdf-file> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --objects   List indirect objects");
    eprintln!("  --trailer   Print the trailer dictionary");
    eprintln!("  --touch     Add a marker object (visible with -o --update)");
    eprintln!("  -o FILE     Write the document to FILE");
    eprintln!("  --update    With -o, append an incremental update instead of");
    eprintln!("              a full rewrite");
}

fn value_kind(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Boolean(b) => format!("boolean {}", b),
        Value::Integer { value, .. } => format!("integer {}", value),
        Value::Real { value, .. } => format!("real {}", value),
        Value::Name(name) => format!("name {}", name),
        Value::String(s) => format!("string ({} bytes)", s.len()),
        Value::HexString(s) => format!("hex string ({} chars)", s.len()),
        Value::Array(items) => format!("array ({} items)", items.len()),
        Value::Dictionary(dict) => format!("dictionary ({} keys)", dict.len()),
        Value::Reference { id, gen } => format!("reference {} {} R", id, gen),
        Value::Stream(data) => format!("stream ({} bytes)", data.len()),
    }
}

fn describe_object(object: &Object) -> String {
    if let Some(offset) = object.indirect_offset() {
        return format!("indirect -> {}", offset);
    }
    let mut parts = Vec::new();
    if !object.dictionary().is_empty() {
        parts.push(format!("dictionary ({} keys)", object.dictionary().len()));
    }
    for value in object.data() {
        parts.push(value_kind(value));
    }
    if parts.is_empty() {
        parts.push("empty".into());
    }
    if !object.used() {
        parts.push("free".into());
    }
    parts.join(", ")
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let path = &args[1];

    if path == "--help" || path == "-h" {
        print_usage(&args[0]);
        return;
    }

    let mut show_objects = false;
    let mut show_trailer = false;
    let mut touch = false;
    let mut update = false;
    let mut output: Option<String> = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--objects" => show_objects = true,
            "--trailer" => show_trailer = true,
            "--touch" => touch = true,
            "--update" => update = true,
            "-o" => {
                i += 1;
                if i < args.len() {
                    output = Some(args[i].clone());
                }
            }
            other => {
                eprintln!("Unknown option: {}", other);
                print_usage(&args[0]);
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut doc = Document::new();
    if let Err(e) = doc.parse(path) {
        eprintln!("Error parsing {}: {}", path, e);
        std::process::exit(1);
    }

    let (major, minor) = doc.version();
    eprintln!("PDF {}.{}, {} objects", major, minor, doc.objects().len());

    if show_objects {
        for object in doc.objects() {
            println!(
                "{} {}: {}",
                object.id(),
                object.generation(),
                describe_object(object)
            );
        }
    }

    if show_trailer {
        for (key, value) in doc.trailer().iter() {
            println!("/{}: {}", key, value_kind(value));
        }
    }

    if touch {
        let next_id = doc.objects().iter().map(Object::id).max().unwrap_or(0) + 1;
        let mut marker = Object::new(next_id, 0);
        marker.dictionary_mut().insert("Type", Value::name("Marker"));
        doc.add_object(marker);
        eprintln!("Added marker object {} 0", next_id);
    }

    if let Some(out) = output {
        match doc.write(&out, update) {
            Ok(()) => eprintln!(
                "{} written to {}",
                if update { "Update" } else { "Document" },
                out
            ),
            Err(e) => {
                eprintln!("Error writing {}: {}", out, e);
                std::process::exit(1);
            }
        }
    }
}
