//! Merge engine: folds a normalized metadata record into an existing ACBF
//! tree (or a fresh minimal one) without disturbing unrelated structure.
//!
//! Per-field policy, not a generic diff: fields the record leaves empty keep
//! whatever the document already says; populated fields replace, append, or
//! dedup as the schema calls for.

use std::collections::HashMap;

use xmltree::{Element, XMLNode};

use crate::acbf::xml::{ElementExt, add_element, element_text, ensure_path};
use crate::acbf::{ACBF_ROOT, NS_ACBF_1_2, SCAN_MARKER};
use crate::meta::{
    COLORIST_SYNONYMS, COVER_SYNONYMS, ComicMetadata, EDITOR_SYNONYMS, INKER_SYNONYMS,
    LETTERER_SYNONYMS, PENCILLER_SYNONYMS, TRANSLATOR_SYNONYMS, WRITER_SYNONYMS,
};

/// Genres the schema accepts. Anything else is silently dropped on write.
const ALLOWED_GENRES: &[&str] = &[
    "other",
    "adult",
    "adventure",
    "alternative",
    "artbook",
    "biography",
    "caricature",
    "children",
    "computer",
    "crime",
    "education",
    "fantasy",
    "history",
    "horror",
    "humor",
    "manga",
    "military",
    "mystery",
    "non-fiction",
    "politics",
    "real_life",
    "religion",
    "romance",
    "science_fiction",
    "sports",
    "superhero",
    "western",
];

/// Merge a record into an optional existing tree and return the updated
/// tree.
///
/// The caller is responsible for having validated and namespace-stripped
/// `existing`. The returned root always declares the current schema
/// namespace, regardless of the version that was read.
pub fn merge_metadata(md: &ComicMetadata, existing: Option<Element>) -> Element {
    let mut root = existing.unwrap_or_else(|| Element::new(ACBF_ROOT));
    root.attributes
        .insert("xmlns".to_string(), NS_ACBF_1_2.to_string());

    write_credits(&mut root, md);
    write_sequence(&mut root, md);
    write_title(&mut root, md);
    write_genres(&mut root, md);
    write_description(&mut root, md);
    write_web_links(&mut root, md);
    write_content_rating(&mut root, md);
    write_keywords(&mut root, md);
    write_name_containers(&mut root, md);
    write_database_ids(&mut root, md);
    write_publish_info(&mut root, md);
    write_document_info(&mut root, md);
    write_pages(&mut root, md);

    root
}

/// Authors are regenerated wholesale: the record is the source of truth for
/// credits, so stale author elements never linger.
fn write_credits(root: &mut Element, md: &ComicMetadata) {
    let book_info = ensure_path(root, "meta-data/book-info");
    book_info.remove_children("author");

    for credit in &md.credits {
        let role = credit.role.to_lowercase();
        let lang = (!credit.language.is_empty()).then_some(credit.language.as_str());

        // Order matters: "artist" belongs to both the penciller and inker
        // synonym lists and must land on the plain Artist activity.
        let (activity, lang) = if WRITER_SYNONYMS.contains(&role.as_str()) {
            ("Writer", lang)
        } else if role == "adapter" {
            ("Adapter", lang)
        } else if role == "artist" {
            ("Artist", None)
        } else if PENCILLER_SYNONYMS.contains(&role.as_str()) {
            ("Penciller", None)
        } else if INKER_SYNONYMS.contains(&role.as_str()) {
            ("Inker", None)
        } else if COLORIST_SYNONYMS.contains(&role.as_str()) {
            ("Colorist", None)
        } else if role == "photographer" || role == "photo" {
            ("Photographer", None)
        } else if LETTERER_SYNONYMS.contains(&role.as_str()) {
            ("Letterer", lang)
        } else if COVER_SYNONYMS.contains(&role.as_str()) {
            ("CoverArtist", None)
        } else if EDITOR_SYNONYMS.contains(&role.as_str()) {
            ("Editor", lang)
        } else if role == "assistant editor" {
            ("Assistant Editor", lang)
        } else if TRANSLATOR_SYNONYMS.contains(&role.as_str()) {
            ("Translator", lang)
        } else {
            ("Other", lang)
        };

        add_author(book_info, &credit.person, activity, lang);
    }
}

/// Split a display name back into the schema's name parts.
///
/// One token is a nickname, two are first+last, three or more are
/// first+middle+last with the extras dropped. Lossy for compound surnames
/// and non-Western name order, but it is the split every interoperating
/// tool expects.
fn add_author(book_info: &mut Element, person: &str, activity: &str, lang: Option<&str>) {
    let tokens: Vec<&str> = person.split_whitespace().collect();

    let (first, middle, last, nickname) = match tokens.as_slice() {
        [] => return,
        [nick] => (None, None, None, Some(*nick)),
        [first, last] => (Some(*first), None, Some(*last), None),
        [first, middle, last, ..] => (Some(*first), Some(*middle), Some(*last), None),
    };

    let mut author = Element::new("author");
    author
        .attributes
        .insert("activity".to_string(), activity.to_string());
    if let Some(lang) = lang {
        author.attributes.insert("lang".to_string(), lang.to_string());
    }
    if let Some(first) = first {
        add_element(&mut author, "first-name", first, &[]);
    }
    if let Some(middle) = middle {
        add_element(&mut author, "middle-name", middle, &[]);
    }
    if let Some(last) = last {
        add_element(&mut author, "last-name", last, &[]);
    }
    if let Some(nickname) = nickname {
        add_element(&mut author, "nickname", nickname, &[]);
    }

    book_info.children.push(XMLNode::Element(author));
}

/// A single sequence is rewritten outright. Multiple sequences are assumed
/// to describe alternate numberings, so only an entry duplicating the new
/// issue number is dropped before the fresh one goes in.
fn write_sequence(root: &mut Element, md: &ComicMetadata) {
    let Some(series) = md.series.as_deref() else {
        return;
    };
    let book_info = ensure_path(root, "meta-data/book-info");

    let count = book_info.children_named("sequence").count();
    if count == 1 {
        book_info.take_child("sequence");
    } else if count > 1 {
        book_info.children.retain(|node| match node.as_element() {
            Some(e) if e.name == "sequence" => element_text(e) != md.issue,
            _ => true,
        });
    }

    let mut sequence = Element::new("sequence");
    sequence
        .attributes
        .insert("title".to_string(), series.to_string());
    if let Some(volume) = md.volume {
        sequence
            .attributes
            .insert("volume".to_string(), volume.to_string());
    }
    if let Some(issue) = md.issue.as_deref().filter(|i| !i.is_empty()) {
        sequence.children.push(XMLNode::Text(issue.to_string()));
    }
    book_info.children.push(XMLNode::Element(sequence));
}

fn write_title(root: &mut Element, md: &ComicMetadata) {
    let Some(title) = md.title.as_deref().filter(|t| !t.is_empty()) else {
        return;
    };
    let book_info = ensure_path(root, "meta-data/book-info");

    // The new title replaces whatever reads as English; foreign-language
    // titles stay put.
    book_info.children.retain(|node| match node.as_element() {
        Some(e) if e.name == "book-title" => !matches!(e.attr("lang"), None | Some("en")),
        _ => true,
    });

    match md.language.as_deref() {
        Some(lang) if !lang.is_empty() => {
            add_element(book_info, "book-title", title, &[("lang", lang)]);
        }
        _ => add_element(book_info, "book-title", title, &[]),
    }
}

fn write_genres(root: &mut Element, md: &ComicMetadata) {
    let book_info = ensure_path(root, "meta-data/book-info");

    // Remember match percentages so re-adding a genre keeps them.
    let previous: Vec<(String, Option<String>)> = book_info
        .children_named("genre")
        .map(|g| {
            (
                element_text(g).unwrap_or_default(),
                g.attr("match").map(str::to_string),
            )
        })
        .collect();
    book_info.remove_children("genre");

    let mut genres = md.genres.clone();
    if md
        .manga
        .as_deref()
        .is_some_and(|m| m.to_lowercase().starts_with("yes"))
    {
        genres.insert("manga".to_string());
    }

    for genre in &genres {
        let mut genre = genre.to_lowercase().replace(' ', "_");
        if genre == "historical" {
            genre = "history".to_string();
        }
        if !ALLOWED_GENRES.contains(&genre.as_str()) {
            continue;
        }

        let matched = previous
            .iter()
            .find(|(text, _)| *text == genre)
            .and_then(|(_, m)| m.as_deref())
            .and_then(|m| m.parse::<i64>().ok())
            .filter(|m| *m > 0);

        match matched {
            Some(m) => add_element(book_info, "genre", &genre, &[("match", &m.to_string())]),
            None => add_element(book_info, "genre", &genre, &[]),
        }
    }
}

/// Skip the write when an existing annotation already says the same thing,
/// paragraph for paragraph; replace an annotation in the record's language
/// rather than duplicating it.
fn write_description(root: &mut Element, md: &ComicMetadata) {
    let Some(description) = md.description.as_deref().filter(|d| !d.is_empty()) else {
        return;
    };
    let book_info = ensure_path(root, "meta-data/book-info");
    let paragraphs: Vec<&str> = description.split("\n\n").collect();

    let already_present = book_info.children_named("annotation").any(|annotation| {
        if annotation.child_elements().next().is_some() {
            let existing: Vec<Option<String>> = annotation
                .child_elements()
                .map(element_text)
                .collect();
            existing.len() == paragraphs.len()
                && existing
                    .iter()
                    .zip(&paragraphs)
                    .all(|(have, want)| have.as_deref() == Some(*want))
        } else {
            element_text(annotation).as_deref() == Some(description)
        }
    });
    if already_present {
        return;
    }

    let lang = md.language.as_deref().filter(|l| !l.is_empty());
    if let Some(lang) = lang
        && let Some(position) = book_info.children.iter().position(|node| {
            node.as_element()
                .is_some_and(|e| e.name == "annotation" && e.attr("lang") == Some(lang))
        })
    {
        book_info.children.remove(position);
    }

    let mut annotation = Element::new("annotation");
    for paragraph in &paragraphs {
        add_element(&mut annotation, "p", paragraph, &[]);
    }
    if let Some(lang) = lang {
        annotation
            .attributes
            .insert("lang".to_string(), lang.to_string());
    }
    book_info.children.push(XMLNode::Element(annotation));
}

fn write_web_links(root: &mut Element, md: &ComicMetadata) {
    if md.web_links.is_empty() {
        return;
    }
    let dbname = origin_name(md).to_string();
    let book_info = ensure_path(root, "meta-data/book-info");

    book_info.children.retain(|node| match node.as_element() {
        Some(e) if e.name == "databaseref" => {
            !e.attr("type").is_some_and(|t| t.eq_ignore_ascii_case("url"))
        }
        _ => true,
    });

    for link in &md.web_links {
        add_element(
            book_info,
            "databaseref",
            link,
            &[("type", "URL"), ("dbname", &dbname)],
        );
    }
}

fn write_content_rating(root: &mut Element, md: &ComicMetadata) {
    let Some(rating) = md.maturity_rating.as_deref().filter(|r| !r.is_empty()) else {
        return;
    };
    let book_info = ensure_path(root, "meta-data/book-info");

    let already_present = book_info
        .children_named("content-rating")
        .any(|r| element_text(r).as_deref() == Some(rating));
    if !already_present {
        add_element(book_info, "content-rating", rating, &[]);
    }
}

fn write_keywords(root: &mut Element, md: &ComicMetadata) {
    if md.tags.is_empty() {
        return;
    }
    let joined = md
        .tags
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    set_element_text(root, "meta-data/book-info/keywords", &joined, &[], false);
}

fn write_name_containers(root: &mut Element, md: &ComicMetadata) {
    for (container, names) in [
        ("characters", &md.characters),
        ("teams", &md.teams),
        ("locations", &md.locations),
    ] {
        if names.is_empty() {
            continue;
        }
        let path = format!("meta-data/book-info/{container}");
        let element = ensure_path(root, &path);
        element.children.clear();
        for name in names {
            add_element(element, "name", name, &[]);
        }
    }
}

/// Issue and series ids dedup by id-type + text; colliding ids from
/// different databases are unlikely enough that dbname is not part of the
/// key.
fn write_database_ids(root: &mut Element, md: &ComicMetadata) {
    if md.issue_id.is_none() && md.series_id.is_none() {
        return;
    }
    let dbname = origin_name(md).to_string();
    let book_info = ensure_path(root, "meta-data/book-info");

    let has_ref = |book_info: &Element, types: &[&str], value: &str| {
        book_info.children_named("databaseref").any(|dbref| {
            dbref
                .attr("type")
                .is_some_and(|t| types.contains(&t.to_lowercase().as_str()))
                && element_text(dbref).as_deref() == Some(value)
        })
    };

    if let Some(issue_id) = md.issue_id.as_deref()
        && !has_ref(book_info, &["issueid", "issue_id", "issue-id"], issue_id)
    {
        add_element(
            book_info,
            "databaseref",
            issue_id,
            &[("type", "IssueID"), ("dbname", &dbname)],
        );
    }

    if let Some(series_id) = md.series_id.as_deref()
        && !has_ref(book_info, &["seriesid", "series_id", "series-id"], series_id)
    {
        add_element(
            book_info,
            "databaseref",
            series_id,
            &[("type", "SeriesID"), ("dbname", &dbname)],
        );
    }
}

fn write_publish_info(root: &mut Element, md: &ComicMetadata) {
    ensure_path(root, "meta-data/publish-info");

    if let Some(identifier) = md.identifier.as_deref().filter(|i| !i.is_empty()) {
        set_element_text(root, "meta-data/publish-info/isbn", identifier, &[], false);
    }

    match md.publisher.as_deref().filter(|p| !p.is_empty()) {
        Some(publisher) => match md.imprint.as_deref().filter(|i| !i.is_empty()) {
            Some(imprint) => set_element_text(
                root,
                "meta-data/publish-info/publisher",
                publisher,
                &[("imprint", imprint)],
                false,
            ),
            None => set_element_text(
                root,
                "meta-data/publish-info/publisher",
                publisher,
                &[],
                true,
            ),
        },
        None => {
            let publish_info = ensure_path(root, "meta-data/publish-info");
            publish_info.remove_children("publisher");
        }
    }

    if let Some(year) = md.year {
        let date = format!(
            "{:04}-{:02}-{:02}",
            normalize_year(year),
            md.month.unwrap_or(1),
            md.day.unwrap_or(1)
        );
        set_element_text(
            root,
            "meta-data/publish-info/publish-date",
            &date,
            &[("value", &date)],
            false,
        );
    }
}

fn write_document_info(root: &mut Element, md: &ComicMetadata) {
    if let Some(notes) = md.notes.as_deref().filter(|n| !n.is_empty()) {
        let history = ensure_path(root, "meta-data/document-info/history");
        history.children.clear();
        for line in notes.split('\n') {
            add_element(history, "p", line, &[]);
        }
    }

    if let Some(scan_info) = md.scan_info.as_deref().filter(|s| !s.is_empty()) {
        let source = ensure_path(root, "meta-data/document-info/source");
        source.children.retain(|node| match node.as_element() {
            Some(e) => !element_text(e).is_some_and(|t| t.starts_with(SCAN_MARKER)),
            None => true,
        });
        add_element(source, "p", &format!("{SCAN_MARKER}{scan_info}"), &[]);
    }
}

/// Rebuild the page list in display order, reusing matching existing page
/// elements so hand-authored attributes and foreign-language titles
/// survive. Page 0 moves into book-info as the cover; everything else goes
/// back into the body.
fn write_pages(root: &mut Element, md: &ComicMetadata) {
    // The body element always exists in a written document, pages or not.
    ensure_path(root, "body");
    if md.pages.is_empty() {
        return;
    }

    let mut existing: HashMap<String, Element> = HashMap::new();

    // The cover lives apart; pull it into the same lookup under its href.
    let book_info = ensure_path(root, "meta-data/book-info");
    if let Some(mut cover) = book_info.take_child("coverpage") {
        if let Some(href) = cover
            .get_child("image")
            .and_then(|image| image.attr("href"))
            .map(str::to_string)
        {
            cover.name = "page".to_string();
            existing.insert(href, cover);
        }
    }

    let body = ensure_path(root, "body");
    for node in body.children.drain(..) {
        if let XMLNode::Element(page) = node
            && page.name == "page"
            && let Some(href) = page
                .get_child("image")
                .and_then(|image| image.attr("href"))
                .map(str::to_string)
        {
            existing.insert(href, page);
        }
    }

    let mut pages = md.pages.clone();
    pages.sort_by_key(|p| p.display_index);
    let lang = md.language.as_deref().filter(|l| !l.is_empty());

    let mut cover_element: Option<Element> = None;
    let mut body_pages: Vec<XMLNode> = Vec::new();

    for (i, page) in pages.iter().enumerate() {
        let mut element = match existing.remove(&page.filename) {
            Some(mut element) => {
                if !page.bookmark.is_empty() {
                    // An untagged or English title is superseded by the
                    // record's bookmark.
                    element.children.retain(|node| match node.as_element() {
                        Some(e) if e.name == "title" => {
                            !matches!(e.attr("lang"), None | Some("en"))
                        }
                        _ => true,
                    });
                }
                element
            }
            None => {
                let mut element = Element::new("page");
                add_element(&mut element, "image", "", &[("href", &page.filename)]);
                element
            }
        };

        if !page.bookmark.is_empty() {
            match lang {
                Some(lang) => add_element(&mut element, "title", &page.bookmark, &[("lang", lang)]),
                None => add_element(&mut element, "title", &page.bookmark, &[]),
            }
        }

        if i == 0 {
            element.name = "coverpage".to_string();
            cover_element = Some(element);
        } else {
            body_pages.push(XMLNode::Element(element));
        }
    }

    if let Some(cover) = cover_element {
        ensure_path(root, "meta-data/book-info")
            .children
            .push(XMLNode::Element(cover));
    }
    ensure_path(root, "body").children.extend(body_pages);
}

/// Find or create the element at `path`, replace its text, and apply
/// attributes. Existing child elements are untouched.
fn set_element_text(
    root: &mut Element,
    path: &str,
    value: &str,
    attrs: &[(&str, &str)],
    clear_attributes: bool,
) {
    let element = ensure_path(root, path);
    if clear_attributes {
        element.attributes.clear();
    }
    element
        .children
        .retain(|node| !matches!(node, XMLNode::Text(_) | XMLNode::CData(_)));
    element.children.push(XMLNode::Text(value.to_string()));
    for (key, value) in attrs {
        element
            .attributes
            .insert((*key).to_string(), (*value).to_string());
    }
}

/// Two-digit years are pivoted at 50: below it they read as 20xx, from
/// there to 99 as 19xx.
fn normalize_year(year: i32) -> i32 {
    if year < 50 {
        2000 + year
    } else if year < 100 {
        1900 + year
    } else {
        year
    }
}

fn origin_name(md: &ComicMetadata) -> &str {
    md.data_origin
        .as_ref()
        .map(|origin| origin.name.as_str())
        .unwrap_or("Unknown")
}
