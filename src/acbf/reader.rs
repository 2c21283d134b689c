//! Extraction engine: a validated, namespace-free ACBF tree plus the
//! archive's page-file listing become a normalized metadata record.

use std::collections::BTreeSet;

use xmltree::Element;

use crate::acbf::SCAN_MARKER;
use crate::acbf::xml::{
    ElementExt, element_text, find_descendant, find_path, preferred_by_lang,
};
use crate::meta::{ComicMetadata, CreditEntry, PageEntry};
use crate::util::{parse_date_str, parse_url, split_list, xlate};

/// Decode a tree into a [`ComicMetadata`] record.
///
/// `page_files` is the archive's page-image listing (see
/// [`crate::util::page_name_list`]); a page's position in it becomes the
/// page's archive index.
pub fn extract_metadata(root: &Element, page_files: &[String]) -> ComicMetadata {
    let mut md = ComicMetadata::default();

    let Some(book_info) = find_path(root, "meta-data/book-info") else {
        log::info!("no book-info found in ACBF document");
        return md;
    };

    // Series, volume, and issue all ride on the first sequence element.
    if let Some(sequence) = book_info.children_named("sequence").next() {
        md.series = xlate(sequence.attr("title"));
        md.volume = sequence.attr("volume").and_then(|v| v.trim().parse().ok());
        md.issue = element_text(sequence);
    }

    let titles: Vec<&Element> = book_info.children_named("book-title").collect();
    md.title = preferred_by_lang(&titles).and_then(element_text);

    // The schema has no series field outside sequence; a lone book-title is
    // really the series name.
    if md.series.is_none() {
        md.series = md.title.take();
    }

    for genre in book_info.children_named("genre") {
        if let Some(text) = element_text(genre) {
            if text.eq_ignore_ascii_case("manga") {
                md.manga = Some("Yes".to_string());
            }
            md.genres.insert(text.replace('_', " ").to_lowercase());
        }
    }

    let annotations: Vec<&Element> = book_info.children_named("annotation").collect();
    md.description = preferred_by_lang(&annotations).and_then(annotation_text);

    if let Some(publisher) = find_descendant(root, "publisher") {
        md.publisher = element_text(publisher);
        md.imprint = xlate(publisher.attr("imprint"));
    }

    // The value attribute is ISO-ish; the element text is free-form and at
    // best yields a year.
    if let Some(date) = find_descendant(root, "publish-date") {
        let (day, month, year) = parse_date_str(date.attr("value"));
        md.day = day;
        md.month = month;
        md.year = year;
        if md.year.is_none()
            && let Some(text) = element_text(date)
        {
            md.year = leading_year(&text);
        }
    }

    md.language = book_info
        .children_named("languages")
        .next()
        .and_then(|languages| languages.child_elements().next())
        .and_then(|layer| layer.attr("lang"))
        .map(str::to_string);

    md.maturity_rating = find_descendant(root, "content-rating").and_then(element_text);

    if let Some(keywords) = find_descendant(root, "keywords").and_then(element_text) {
        md.tags = split_list(&keywords, ',').into_iter().collect();
    }

    md.characters = name_set(book_info, "characters");
    md.teams = name_set(book_info, "teams");
    md.locations = name_set(book_info, "locations");

    for dbref in book_info.children_named("databaseref") {
        if dbref
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("url"))
            && let Some(link) = element_text(dbref)
        {
            md.web_links.push(parse_url(&link));
        }
    }

    md.identifier = find_descendant(root, "isbn").and_then(element_text);

    for author in book_info.children_named("author") {
        if let Some(credit) = decode_author(author) {
            md.credits.push(credit);
        }
    }

    if let Some(history) = find_descendant(root, "history") {
        let lines: Vec<String> = history.child_elements().filter_map(element_text).collect();
        if !lines.is_empty() {
            md.notes = Some(lines.join("\n"));
        }
    }

    if let Some(source) = find_descendant(root, "source") {
        for paragraph in source.child_elements() {
            if let Some(text) = element_text(paragraph)
                && let Some(rest) = text.strip_prefix(SCAN_MARKER)
            {
                md.scan_info = Some(rest.to_string());
                break;
            }
        }
    }

    decode_pages(root, book_info, page_files, &mut md);

    md.is_empty = false;
    md
}

/// Join an annotation's paragraph children with blank lines, or fall back
/// to its own text when it has no children.
fn annotation_text(annotation: &Element) -> Option<String> {
    if annotation.child_elements().next().is_some() {
        let paragraphs: Vec<String> = annotation
            .child_elements()
            .filter_map(element_text)
            .collect();
        (!paragraphs.is_empty()).then(|| paragraphs.join("\n\n"))
    } else {
        element_text(annotation)
    }
}

/// Reconstruct a display name and role from an author element.
///
/// The schema splits names into first/middle/last/nickname; the record
/// carries one display string. Authors without an activity or without any
/// usable name part are skipped.
fn decode_author(author: &Element) -> Option<CreditEntry> {
    let role = author.attr("activity").filter(|r| !r.is_empty())?;
    let role = if role.eq_ignore_ascii_case("coverartist") {
        "Cover".to_string()
    } else {
        role.to_string()
    };

    let first = author.get_child("first-name").and_then(element_text);
    let middle = author.get_child("middle-name").and_then(element_text);
    let last = author.get_child("last-name").and_then(element_text);
    let nickname = author.get_child("nickname").and_then(element_text);

    let person = match (first, last) {
        (Some(first), Some(last)) => match middle {
            Some(middle) => format!("{first} {middle} {last}"),
            None => format!("{first} {last}"),
        },
        (first, _) => match nickname {
            Some(nickname) => nickname,
            None => first?,
        },
    };

    Some(CreditEntry {
        person,
        role,
        language: author.attr("lang").unwrap_or_default().to_string(),
    })
}

fn name_set(book_info: &Element, container: &str) -> BTreeSet<String> {
    book_info
        .children_named(container)
        .flat_map(|c| c.children_named("name"))
        .filter_map(element_text)
        .collect()
}

/// Rebuild the page list with the cover first.
///
/// The schema stores the cover under book-info, apart from the body's page
/// list; logically it is always page 0, so it is stitched back on before
/// indices are assigned.
fn decode_pages(
    root: &Element,
    book_info: &Element,
    page_files: &[String],
    md: &mut ComicMetadata,
) {
    let mut page_elements: Vec<&Element> = Vec::new();
    if let Some(cover) = book_info.get_child("coverpage") {
        page_elements.push(cover);
    }
    if let Some(body) = root.get_child("body") {
        page_elements.extend(body.children_named("page"));
    }

    for (i, page) in page_elements.into_iter().enumerate() {
        let titles: Vec<&Element> = page.children_named("title").collect();
        let bookmark = preferred_by_lang(&titles)
            .and_then(element_text)
            .unwrap_or_default();

        let filename = page
            .get_child("image")
            .and_then(|image| image.attr("href"))
            .unwrap_or_default()
            .to_string();

        let archive_index = page_files
            .iter()
            .position(|f| *f == filename)
            .unwrap_or(i);

        md.pages.push(PageEntry {
            filename,
            display_index: i,
            archive_index,
            bookmark,
            page_type: String::new(),
        });
    }
}

fn leading_year(text: &str) -> Option<i32> {
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }
    digits[..4].parse().ok()
}
