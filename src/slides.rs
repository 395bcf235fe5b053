//! Slide decks
//!
//! A deck is a title plus a list of tagged slide descriptions, loaded
//! from JSON and rendered to a single self-contained HTML file with one
//! `<section>` per slide.

use crate::brand_kit::BrandKit;
use crate::error::{DeckError, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deck {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Slide {
    Title {
        title: String,
        #[serde(default)]
        subtitle: String,
    },
    Content {
        title: String,
        #[serde(default)]
        bullets: Vec<String>,
    },
    ContentWithImage {
        title: String,
        #[serde(default)]
        bullets: Vec<String>,
        #[serde(default)]
        image: String,
        #[serde(default)]
        image_position: ImagePosition,
    },
    FullImage {
        #[serde(default)]
        title: String,
        #[serde(default)]
        image: String,
    },
    TwoColumn {
        title: String,
        #[serde(default)]
        left: Column,
        #[serde(default)]
        right: Column,
    },
    Quote {
        quote: String,
        #[serde(default)]
        author: String,
    },
    Chart {
        title: String,
        #[serde(default)]
        chart_image: String,
    },
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImagePosition {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Column {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

impl Slide {
    /// Image the slide depends on, if it is an image-bearing slide
    pub fn image(&self) -> Option<&str> {
        match self {
            Slide::ContentWithImage { image, .. } | Slide::FullImage { image, .. } => {
                Some(image.as_str())
            }
            Slide::Chart { chart_image, .. } => Some(chart_image.as_str()),
            _ => None,
        }
    }
}

impl Deck {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            slides: Vec::new(),
        }
    }

    pub fn push(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    pub fn from_json(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
        serde_json::from_str(&contents).map_err(|e| Error::parse(path.display().to_string(), e))
    }

    /// Title must be set and image slides must name an image (1-based slide numbers)
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Deck(DeckError::MissingTitle));
        }
        for (i, slide) in self.slides.iter().enumerate() {
            if let Some(image) = slide.image() {
                if image.trim().is_empty() {
                    return Err(Error::Deck(DeckError::MissingImage { slide: i + 1 }));
                }
            }
        }
        Ok(())
    }
}

/// File-system safe stem derived from a title, or `fallback` when the
/// title has no usable characters
pub fn safe_filename(title: &str, fallback: &str) -> String {
    let kept: String = title
        .chars()
        .take(50)
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let stem = kept.trim().replace(' ', "_");
    if stem.is_empty() {
        fallback.to_string()
    } else {
        stem
    }
}

/// Accept a caller-chosen file stem only if it names a file directly
/// inside the output directory
pub fn checked_stem(stem: &str) -> Result<&str> {
    let trimmed = stem.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('.')
        || trimmed.contains(['/', '\\', '\0'])
        || trimmed.contains("..")
    {
        return Err(Error::InvalidArgument(format!(
            "'{}' is not a plain file name",
            stem
        )));
    }
    Ok(trimmed)
}

/// Render the deck as one HTML document
pub fn render_html(deck: &Deck, kit: Option<&BrandKit>) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n",
        escape(&deck.title),
        stylesheet(kit)
    );

    push_title(&mut html, &deck.title, &deck.subtitle);
    for slide in &deck.slides {
        push_slide(&mut html, slide);
    }

    if let Some(kit) = kit {
        if let Some(logo) = &kit.logo {
            let _ = writeln!(html, "<img class=\"logo\" src=\"{}\" alt=\"logo\">", escape(logo));
        }
        if let Some(mark) = &kit.watermark {
            let _ = writeln!(html, "<div class=\"watermark\">{}</div>", escape(mark));
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Render and write `<output_dir>/<safe_filename>.html`
pub fn write_deck(deck: &Deck, output_dir: &Path, kit: Option<&BrandKit>) -> Result<PathBuf> {
    deck.validate()?;
    fs::create_dir_all(output_dir).map_err(|e| Error::create_dir(output_dir, e))?;

    let stem = safe_filename(&deck.title, "presentation");
    let path = output_dir.join(format!("{}.html", stem));
    fs::write(&path, render_html(deck, kit)).map_err(|e| Error::write(&path, e))?;
    info!("Presentation created: {} ({} slides)", path.display(), deck.slides.len() + 1);
    Ok(path)
}

fn stylesheet(kit: Option<&BrandKit>) -> String {
    let (primary, secondary, accent, headline, body) = match kit {
        Some(k) => (
            k.colors.primary.as_str(),
            k.colors.secondary.as_str(),
            k.colors.accent.as_str(),
            k.fonts.headline.as_str(),
            k.fonts.body.as_str(),
        ),
        None => ("#002060", "#ffffff", "#f0a500", "Inter", "Inter"),
    };

    format!(
        ":root {{ --primary: {primary}; --secondary: {secondary}; --accent: {accent}; }}\n\
         body {{ margin: 0; font-family: '{body}', sans-serif; background: #222; }}\n\
         section {{ aspect-ratio: 16 / 9; width: 100vw; box-sizing: border-box; padding: 6vw; margin-bottom: 8px; background: var(--secondary); page-break-after: always; }}\n\
         h1, h2 {{ font-family: '{headline}', sans-serif; color: var(--primary); }}\n\
         section.title h1 {{ font-size: 5vw; }}\n\
         section.quote blockquote {{ font-size: 3vw; font-style: italic; border-left: 8px solid var(--accent); padding-left: 2vw; }}\n\
         .split {{ display: flex; gap: 4vw; }}\n\
         .split > * {{ flex: 1; }}\n\
         img {{ max-width: 100%; max-height: 70vh; }}\n\
         .logo {{ position: fixed; top: 16px; right: 16px; height: 48px; }}\n\
         .watermark {{ position: fixed; bottom: 16px; right: 16px; opacity: 0.3; }}\n"
    )
}

fn push_title(html: &mut String, title: &str, subtitle: &str) {
    let _ = writeln!(
        html,
        "<section class=\"title\"><h1>{}</h1><h2>{}</h2></section>",
        escape(title),
        escape(subtitle)
    );
}

fn push_bullets(html: &mut String, bullets: &[String]) {
    html.push_str("<ul>");
    for bullet in bullets {
        let _ = write!(html, "<li>{}</li>", escape(bullet));
    }
    html.push_str("</ul>");
}

fn push_slide(html: &mut String, slide: &Slide) {
    match slide {
        Slide::Title { title, subtitle } => push_title(html, title, subtitle),
        Slide::Content { title, bullets } => {
            let _ = write!(html, "<section class=\"content\"><h2>{}</h2>", escape(title));
            push_bullets(html, bullets);
            html.push_str("</section>\n");
        }
        Slide::ContentWithImage {
            title,
            bullets,
            image,
            image_position,
        } => {
            let _ = write!(
                html,
                "<section class=\"content-image\"><h2>{}</h2><div class=\"split\">",
                escape(title)
            );
            let img = format!("<img src=\"{}\" alt=\"\">", escape(image));
            if *image_position == ImagePosition::Left {
                html.push_str(&img);
            }
            push_bullets(html, bullets);
            if *image_position == ImagePosition::Right {
                html.push_str(&img);
            }
            html.push_str("</div></section>\n");
        }
        Slide::FullImage { title, image } => {
            let _ = writeln!(
                html,
                "<section class=\"full-image\"><h2>{}</h2><img src=\"{}\" alt=\"{}\"></section>",
                escape(title),
                escape(image),
                escape(title)
            );
        }
        Slide::TwoColumn { title, left, right } => {
            let _ = write!(
                html,
                "<section class=\"two-column\"><h2>{}</h2><div class=\"split\">",
                escape(title)
            );
            for column in [left, right] {
                let _ = write!(html, "<div><h3>{}</h3>", escape(&column.heading));
                push_bullets(html, &column.bullets);
                html.push_str("</div>");
            }
            html.push_str("</div></section>\n");
        }
        Slide::Quote { quote, author } => {
            let _ = writeln!(
                html,
                "<section class=\"quote\"><blockquote>&ldquo;{}&rdquo;<footer>&mdash; {}</footer></blockquote></section>",
                escape(quote),
                escape(author)
            );
        }
        Slide::Chart { title, chart_image } => {
            let _ = writeln!(
                html,
                "<section class=\"chart\"><h2>{}</h2><img src=\"{}\" alt=\"chart\"></section>",
                escape(title),
                escape(chart_image)
            );
        }
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
