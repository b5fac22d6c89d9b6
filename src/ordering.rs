//! Sorting the top-level chapter collection by `(storyId, order)`
//!
//! Key values are arbitrary JSON. Numbers compare numerically (booleans count
//! as 0 and 1), strings by code point, and arrays element by element. Equal
//! values never need an ordering, so a collection where every chapter shares
//! one `null` or object `storyId` sorts fine. Only two distinct values that
//! have no ordering between them make the sort fail. `order` values are only
//! compared among chapters of the same story.
//!
//! Both passes are stable, so chapters with identical keys keep their relative
//! insertion order.

use crate::error::{RecordRef, StructuralError};
use crate::model::Chapter;
use serde_json::{Number, Value};
use std::cmp::Ordering;

static ABSENT: Value = Value::Null;

fn as_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::Bool(b) => Some(Number::from(u8::from(*b))),
        _ => None,
    }
}

fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x.cmp(&y);
    }
    // Fractional, or one side beyond i64 and the other negative.
    let x = a.as_f64().unwrap_or(f64::NAN);
    let y = b.as_f64().unwrap_or(f64::NAN);
    x.total_cmp(&y)
}

/// Equality of key values. Numbers and booleans match by value, containers
/// match when their elements do.
pub fn keys_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| keys_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| keys_equal(l, r)))
        }
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => compare_numbers(&x, &y) == Ordering::Equal,
            _ => a == b,
        },
    }
}

/// Compares two key values, or returns `None` when they differ and have no
/// defined ordering against each other.
pub fn compare_keys(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Array(x), Value::Array(y)) => {
            match x.iter().zip(y).find(|(l, r)| !keys_equal(l, r)) {
                Some((l, r)) => compare_keys(l, r),
                None => Some(x.len().cmp(&y.len())),
            }
        }
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => Some(compare_numbers(&x, &y)),
            _ if keys_equal(a, b) => Some(Ordering::Equal),
            _ => None,
        },
    }
}

fn story_key(chapter: &Chapter) -> &Value {
    chapter.story_id.as_ref().unwrap_or(&ABSENT)
}

fn order_key(chapter: &Chapter) -> &Value {
    chapter.order.as_ref().unwrap_or(&ABSENT)
}

/// Checks that every pair of distinct values has an ordering. Repeats of a
/// value already seen are never compared.
fn check_orderable<'a>(
    field: &'static str,
    values: impl Iterator<Item = &'a Value>,
) -> Result<(), StructuralError> {
    let mut distinct: Vec<&Value> = Vec::new();
    for value in values {
        if distinct.iter().any(|seen| keys_equal(seen, value)) {
            continue;
        }
        if let Some(seen) = distinct
            .iter()
            .find(|seen| compare_keys(seen, value).is_none())
        {
            return Err(StructuralError::Unorderable {
                field,
                left: (*seen).clone(),
                right: value.clone(),
            });
        }
        distinct.push(value);
    }
    Ok(())
}

/// Stable sort of `chapters` by `(storyId, order)` ascending.
///
/// Fails without reordering anything if a chapter lacks either key or if the
/// key values can't be compared.
pub fn sort_chapters(chapters: &mut [Chapter]) -> Result<(), StructuralError> {
    for (index, chapter) in chapters.iter().enumerate() {
        if chapter.story_id.is_none() {
            return Err(StructuralError::missing(RecordRef::Chapter(index), "storyId"));
        }
        if chapter.order.is_none() {
            return Err(StructuralError::missing(RecordRef::Chapter(index), "order"));
        }
    }

    check_orderable("storyId", chapters.iter().map(story_key))?;
    let by_story = |a: &Chapter, b: &Chapter| {
        compare_keys(story_key(a), story_key(b)).unwrap_or(Ordering::Equal)
    };

    // Group by story first, then make sure each group's orders are comparable
    // before touching the order within it.
    let mut grouped = chapters.to_vec();
    grouped.sort_by(by_story);
    for run in grouped.chunk_by(|a, b| by_story(a, b) == Ordering::Equal) {
        check_orderable("order", run.iter().map(order_key))?;
    }

    for run in grouped.chunk_by_mut(|a, b| by_story(a, b) == Ordering::Equal) {
        run.sort_by(|a, b| compare_keys(order_key(a), order_key(b)).unwrap_or(Ordering::Equal));
    }
    chapters.clone_from_slice(&grouped);
    Ok(())
}
