use std::fmt::Display;
use std::io::IsTerminal;

use classgraph::{
    ClassAttributes, ClassLink, LinkImportReport, NamespaceInfo, NodeImportReport, NodeRecord,
};
use nu_ansi_term::{Color, Style};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Theme {
    Auto,
    Light,
    Dark,
    Plain,
}

/// Text renderer for command output. Colors are only emitted on a terminal.
pub struct Ui {
    palette: Palette,
    paint: bool,
}

impl Ui {
    pub fn new(theme: Theme) -> Self {
        let paint = theme != Theme::Plain && std::io::stdout().is_terminal();

        #[cfg(windows)]
        if paint {
            let _ = nu_ansi_term::enable_ansi_support();
        }

        let palette = match theme {
            Theme::Plain => Palette::plain(),
            Theme::Light => Palette::light(),
            Theme::Dark | Theme::Auto => Palette::dark(),
        };
        Self { palette, paint }
    }

    pub fn class(
        &self,
        class: &ClassAttributes,
        properties: &[String],
        links: &[ClassLink],
        data_nodes: usize,
    ) {
        let mode = if class.is_strict() { "strict" } else { "lax" };
        let mut fields = vec![
            ("id", class.id.to_string()),
            ("uri", class.uri.clone().unwrap_or_else(|| "-".into())),
            ("mode", mode.to_string()),
            ("data nodes", data_nodes.to_string()),
        ];
        if let Some(code) = &class.code {
            fields.push(("code", code.clone()));
        }
        if class.no_datanodes {
            fields.push(("instances", "forbidden".into()));
        }
        self.fields(&format!("Class {}", class.name), fields);
        self.bullets("Properties", properties.iter(), "no properties");
        self.bullets(
            "Relationships",
            links.iter().map(|l| match l.link_node {
                Some(link) => format!("-[{}]-> {} (via link #{link})", l.name, l.target_name),
                None => format!("-[{}]-> {}", l.name, l.target_name),
            }),
            "no relationships",
        );
    }

    pub fn classes(&self, classes: &[ClassAttributes]) {
        self.bullets(
            "Classes",
            classes.iter().map(|c| {
                let mode = if c.is_strict() { "strict" } else { "lax" };
                format!("{} ({mode})", c.name)
            }),
            "no classes defined",
        );
    }

    pub fn namespaces(&self, namespaces: &[NamespaceInfo]) {
        self.bullets(
            "Namespaces",
            namespaces.iter().map(|ns| {
                format!(
                    "{} (next {}{}{})",
                    ns.name,
                    ns.prefix.as_deref().unwrap_or_default(),
                    ns.next_count,
                    ns.suffix.as_deref().unwrap_or_default()
                )
            }),
            "no namespaces defined",
        );
    }

    pub fn node(&self, class: &str, node: &NodeRecord) {
        self.fields(
            &format!("{class} #{}", node.id),
            node.props.iter().map(|(k, v)| (k.as_str(), v.to_string())),
        );
    }

    pub fn node_report(&self, class: &str, report: &NodeImportReport) {
        self.fields(
            &format!("Imported into {class}"),
            [
                ("created", report.created),
                ("written", report.touched.len()),
                ("skipped", report.skipped),
                ("batches", report.batches),
            ],
        );
    }

    pub fn link_report(&self, relationship: &str, report: &LinkImportReport) {
        self.fields(
            &format!("Imported {relationship} relationships"),
            [
                ("created", report.created),
                ("skipped", report.skipped),
                ("batches", report.batches),
            ],
        );
    }

    pub fn success(&self, message: &str) {
        println!("{} {message}", self.icon(SUCCESS_ICON, self.palette.success));
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{} {message}", self.icon(WARNING_ICON, self.palette.warn));
    }

    fn fields<'a, I, V>(&self, title: &str, rows: I)
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Display,
    {
        let rows: Vec<(&str, String)> = rows
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect();
        self.heading(title);
        let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in rows {
            let key = format!("{key:>width$}:");
            if self.paint {
                println!(
                    "  {} {}",
                    self.palette.key.paint(key),
                    self.palette.value.paint(value)
                );
            } else {
                println!("  {key} {value}");
            }
        }
    }

    /// One bullet per entry, or `empty` as an info line when there are none.
    fn bullets<I, E>(&self, title: &str, entries: I, empty: &str)
    where
        I: IntoIterator<Item = E>,
        E: Display,
    {
        let mut entries = entries.into_iter().peekable();
        if entries.peek().is_none() {
            println!("{} {empty}", self.icon(INFO_ICON, self.palette.info));
            return;
        }
        self.heading(title);
        let bullet = self.icon(BULLET_ICON, self.palette.bullet);
        for entry in entries {
            println!("  {bullet} {entry}");
        }
    }

    fn icon(&self, icon: &'static str, style: Style) -> String {
        if self.paint {
            style.paint(icon).to_string()
        } else {
            icon.to_string()
        }
    }

    fn heading(&self, title: &str) {
        let line = format!("{HEADING_ICON} {title}");
        if self.paint {
            println!("{}", self.palette.heading.paint(line));
        } else {
            println!("{line}");
        }
    }
}

struct Palette {
    heading: Style,
    key: Style,
    value: Style,
    bullet: Style,
    info: Style,
    success: Style,
    warn: Style,
}

impl Palette {
    fn dark() -> Self {
        Self {
            heading: Color::Purple.bold(),
            key: Color::LightBlue.bold(),
            value: Color::White.normal(),
            bullet: Color::LightBlue.normal(),
            info: Color::LightCyan.normal(),
            success: Color::LightGreen.bold(),
            warn: Color::Yellow.bold(),
        }
    }

    fn light() -> Self {
        Self {
            heading: Color::Blue.bold(),
            key: Color::Black.bold(),
            value: Color::Black.normal(),
            bullet: Color::Blue.normal(),
            info: Color::Purple.normal(),
            success: Color::Green.bold(),
            warn: Color::Red.bold(),
        }
    }

    fn plain() -> Self {
        let none = Style::new();
        Self {
            heading: none,
            key: none,
            value: none,
            bullet: none,
            info: none,
            success: none,
            warn: none,
        }
    }
}

const HEADING_ICON: &str = "▸";
const BULLET_ICON: &str = "-";
const SUCCESS_ICON: &str = "✔";
const WARNING_ICON: &str = "⚠";
const INFO_ICON: &str = "ℹ";
