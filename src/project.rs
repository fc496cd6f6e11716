use std::path::Path;

use roxmltree::Node;

use crate::error::Error;
use crate::model::{
    DEFAULT_FONT_SIZE, Description, Form, FormItem, Point, Project, StyledText, TextRun,
};

const DEFAULT_FORM_WIDTH: f32 = 640.0;
const DEFAULT_FORM_HEIGHT: f32 = 480.0;

/// Read a project file. Relative `<diagram src>` paths resolve against the
/// file's directory.
pub fn parse(path: &Path) -> Result<Project, Error> {
    let xml_content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
            std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
        ),
        _ => Error::Io(e),
    })?;
    let mut project = parse_str(&xml_content)?;

    if let Some(base) = path.parent() {
        for form in &mut project.forms {
            if let Some(src) = form.diagram.as_mut()
                && src.is_relative()
            {
                *src = base.join(&*src);
            }
        }
    }
    Ok(project)
}

pub fn parse_str(xml_content: &str) -> Result<Project, Error> {
    let xml = roxmltree::Document::parse(xml_content)?;
    let root = xml.root_element();
    if root.tag_name().name() != "project" {
        return Err(Error::InvalidProject(format!(
            "root element is <{}>, expected <project>",
            root.tag_name().name()
        )));
    }

    let name = root.attribute("name").unwrap_or_default().to_string();
    let description = child(root, "description")
        .map(parse_styled_text)
        .transpose()?
        .unwrap_or_default();

    let forms = root
        .children()
        .filter(|n| n.has_tag_name("form"))
        .map(parse_form)
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!("Parsed project \"{name}\" with {} forms", forms.len());

    Ok(Project {
        name,
        description,
        forms,
    })
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn describe(node: Node) -> String {
    match node.attribute("tabName").or_else(|| node.attribute("id")) {
        Some(name) => format!("<{} \"{}\">", node.tag_name().name(), name),
        None => format!("<{}>", node.tag_name().name()),
    }
}

fn required<'a>(node: Node<'a, '_>, attr: &str) -> Result<&'a str, Error> {
    node.attribute(attr).ok_or_else(|| {
        Error::InvalidProject(format!("{} is missing attribute \"{attr}\"", describe(node)))
    })
}

fn number(node: Node, attr: &str) -> Result<Option<f32>, Error> {
    let Some(raw) = node.attribute(attr) else {
        return Ok(None);
    };
    match raw.trim().parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(Error::InvalidProject(format!(
            "{}: attribute \"{attr}\" is not a number: {raw:?}",
            describe(node)
        ))),
    }
}

fn required_number(node: Node, attr: &str) -> Result<f32, Error> {
    number(node, attr)?.ok_or_else(|| {
        Error::InvalidProject(format!("{} is missing attribute \"{attr}\"", describe(node)))
    })
}

fn parse_form(node: Node) -> Result<Form, Error> {
    let name = required(node, "tabName")?.to_string();
    let width = number(node, "width")?.unwrap_or(DEFAULT_FORM_WIDTH);
    let height = number(node, "height")?.unwrap_or(DEFAULT_FORM_HEIGHT);
    if width <= 0.0 || height <= 0.0 {
        return Err(Error::InvalidProject(format!(
            "{}: form size must be positive, got {width}x{height}",
            describe(node)
        )));
    }

    let mut items = Vec::new();
    let mut diagram = None;
    let mut descriptions = Vec::new();

    for el in node.children().filter(|n| n.is_element()) {
        match el.tag_name().name() {
            "desc" => descriptions.push(Description {
                id: required(el, "id")?.to_string(),
                text: parse_styled_text(el)?,
            }),
            "diagram" => diagram = Some(required(el, "src")?.into()),
            "line" => items.push(FormItem::Line {
                from: Point {
                    x: required_number(el, "x1")?,
                    y: required_number(el, "y1")?,
                },
                to: Point {
                    x: required_number(el, "x2")?,
                    y: required_number(el, "y2")?,
                },
            }),
            "polyline" => items.push(FormItem::Polyline {
                points: parse_points(el, required(el, "points")?)?,
                closed: el.attribute("closed") == Some("true"),
            }),
            "rect" => items.push(FormItem::Rect {
                x: required_number(el, "x")?,
                y: required_number(el, "y")?,
                width: required_number(el, "width")?,
                height: required_number(el, "height")?,
            }),
            "label" => items.push(FormItem::Label {
                origin: Point {
                    x: required_number(el, "x")?,
                    y: required_number(el, "y")?,
                },
                run: parse_run(el)?,
            }),
            "spinbox" => items.push(FormItem::SpinBox {
                x: required_number(el, "x")?,
                y: required_number(el, "y")?,
                width: required_number(el, "width")?,
                height: required_number(el, "height")?,
                value: el.attribute("value").unwrap_or("0").to_string(),
            }),
            other => log::warn!("Ignoring unknown element <{other}> in form \"{name}\""),
        }
    }

    Ok(Form {
        name,
        width,
        height,
        items,
        diagram,
        descriptions,
    })
}

fn parse_points(node: Node, raw: &str) -> Result<Vec<Point>, Error> {
    raw.split_whitespace()
        .map(|pair| {
            let (x, y) = pair.split_once(',').unwrap_or((pair, ""));
            match (x.parse::<f32>(), y.parse::<f32>()) {
                (Ok(x), Ok(y)) => Ok(Point { x, y }),
                _ => Err(Error::InvalidProject(format!(
                    "{}: bad point {pair:?}",
                    describe(node)
                ))),
            }
        })
        .collect()
}

/// `<text>` children, or the element's own text when it has none.
fn parse_styled_text(node: Node) -> Result<StyledText, Error> {
    let text_nodes: Vec<Node> = node.children().filter(|n| n.has_tag_name("text")).collect();
    let runs = if text_nodes.is_empty() {
        match node.text().map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => vec![TextRun::plain(t)],
            None => Vec::new(),
        }
    } else {
        text_nodes
            .into_iter()
            .map(parse_run)
            .collect::<Result<Vec<_>, _>>()?
    };
    Ok(StyledText { runs })
}

fn parse_run(node: Node) -> Result<TextRun, Error> {
    let size = number(node, "size")?.unwrap_or(DEFAULT_FONT_SIZE);
    if size <= 0.0 {
        return Err(Error::InvalidProject(format!(
            "{}: font size must be positive",
            describe(node)
        )));
    }
    let mut run = TextRun {
        text: node.text().unwrap_or_default().to_string(),
        size,
        bold: false,
        italic: false,
        underline: false,
    };
    apply_style(&mut run, node.attribute("style").unwrap_or("normal"));
    Ok(run)
}

fn apply_style(run: &mut TextRun, style: &str) {
    for flag in style
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
    {
        match flag.to_ascii_lowercase().as_str() {
            "normal" => {}
            "bold" => run.bold = true,
            "italic" => run.italic = true,
            "underline" => run.underline = true,
            other => log::warn!("Unknown text style {other:?}"),
        }
    }
}
