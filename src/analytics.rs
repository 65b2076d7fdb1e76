//! Derived analytics over one user's file list.
//!
//! Every aggregate is a pure function over the in-memory list and is
//! recomputed in full on each call. Input size is bounded by a single
//! user's upload history, so nothing here is incremental.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{FileKind, FileRecord};

/// File counts per type class.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct TypeHistogram {
    pub images: u64,
    pub videos: u64,
    pub documents: u64,
    pub audio: u64,
    pub others: u64,
}

/// Upload counts: trailing 7 days (rolling), current calendar month, total.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct UploadActivity {
    pub week: usize,
    pub month: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct FileSummary {
    pub id: Uuid,
    pub name: String,
    pub size_bytes: i64,
}

impl FileSummary {
    fn of(file: &FileRecord) -> Self {
        FileSummary {
            id: file.id,
            name: file.title().to_string(),
            size_bytes: file.size_bytes,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// Upload count for one calendar day, day formatted as YYYY-MM-DD.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub day: String,
    pub count: usize,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct DownloadCount {
    pub name: String,
    pub downloads: i64,
}

/// A connected component of files linked by shared tags, labelled with the
/// component's most frequent tag.
#[derive(Debug, Serialize)]
pub struct TagCluster {
    pub top_tag: String,
    pub count: usize,
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsReport {
    pub file_types: TypeHistogram,
    pub storage_used_mb: f64,
    pub upload_activity: UploadActivity,
    pub largest_files: Vec<FileSummary>,
    pub duplicate_files: Vec<FileSummary>,
    pub top_tags: Vec<TagCount>,
    pub upload_history: Vec<DayCount>,
    pub top_downloads: Vec<DownloadCount>,
    pub clusters: Vec<TagCluster>,
}

impl AnalyticsReport {
    pub fn build(files: &[FileRecord], now: DateTime<Utc>) -> Self {
        AnalyticsReport {
            file_types: type_histogram(files),
            storage_used_mb: storage_used_mb(files),
            upload_activity: upload_activity(files, now),
            largest_files: largest_files(files),
            duplicate_files: duplicate_files(files),
            top_tags: top_tags(files),
            upload_history: upload_history(files, now),
            top_downloads: top_downloads(files),
            clusters: tag_clusters(files),
        }
    }
}

/// Partition files into {Images, Videos, Documents, Audio, Others} by
/// MIME type prefix.
pub fn type_histogram(files: &[FileRecord]) -> TypeHistogram {
    let mut histogram = TypeHistogram::default();
    for file in files {
        match FileKind::of(&file.mime_type) {
            FileKind::Images => histogram.images += 1,
            FileKind::Videos => histogram.videos += 1,
            FileKind::Documents => histogram.documents += 1,
            FileKind::Audio => histogram.audio += 1,
            FileKind::Others => histogram.others += 1,
        }
    }
    histogram
}

/// Total storage in MB, rounded to two decimals.
pub fn storage_used_mb(files: &[FileRecord]) -> f64 {
    let total_bytes: i64 = files.iter().map(|f| f.size_bytes).sum();
    let mb = total_bytes as f64 / (1024.0 * 1024.0);
    (mb * 100.0).round() / 100.0
}

pub fn upload_activity(files: &[FileRecord], now: DateTime<Utc>) -> UploadActivity {
    let week = files
        .iter()
        .filter(|f| now.signed_duration_since(f.created_at) <= Duration::days(7))
        .count();
    let month = files
        .iter()
        .filter(|f| f.created_at.month() == now.month() && f.created_at.year() == now.year())
        .count();

    UploadActivity {
        week,
        month,
        total: files.len(),
    }
}

/// Top 5 by size descending; ties keep input order (stable sort).
pub fn largest_files(files: &[FileRecord]) -> Vec<FileSummary> {
    let mut sorted: Vec<&FileRecord> = files.iter().collect();
    sorted.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
    sorted.into_iter().take(5).map(FileSummary::of).collect()
}

/// Files sharing an identical (original name, size) pair with an earlier
/// file. The first occurrence of a key is never flagged.
pub fn duplicate_files(files: &[FileRecord]) -> Vec<FileSummary> {
    let mut seen: HashSet<(&str, i64)> = HashSet::new();
    let mut duplicates = Vec::new();

    for file in files {
        if !seen.insert((file.original_name.as_str(), file.size_bytes)) {
            duplicates.push(FileSummary::of(file));
        }
    }
    duplicates
}

/// Tag frequency across all files, top 5 by count descending. Tags are
/// counted once per file occurrence, not deduplicated within a file; ties
/// rank by first appearance in the input.
pub fn top_tags(files: &[FileRecord]) -> Vec<TagCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for file in files {
        for tag in &file.tags {
            let entry = counts.entry(tag.as_str()).or_insert(0);
            if *entry == 0 {
                order.push(tag.as_str());
            }
            *entry += 1;
        }
    }

    let mut ranked: Vec<(usize, &str, u64)> = order
        .into_iter()
        .enumerate()
        .map(|(i, tag)| (i, tag, counts[tag]))
        .collect();
    ranked.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

    ranked
        .into_iter()
        .take(5)
        .map(|(_, tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect()
}

/// Upload counts for the 7 trailing calendar days including today, matched
/// by year/month/day, oldest day first.
pub fn upload_history(files: &[FileRecord], now: DateTime<Utc>) -> Vec<DayCount> {
    (0..7)
        .rev()
        .map(|back| {
            let day = now - Duration::days(back);
            let count = files
                .iter()
                .filter(|f| {
                    f.created_at.year() == day.year()
                        && f.created_at.month() == day.month()
                        && f.created_at.day() == day.day()
                })
                .count();
            DayCount {
                day: day.format("%Y-%m-%d").to_string(),
                count,
            }
        })
        .collect()
}

/// Top 10 by download count descending, deduplicated by display name
/// (the first occurrence keeps its count).
pub fn top_downloads(files: &[FileRecord]) -> Vec<DownloadCount> {
    let mut sorted: Vec<&FileRecord> = files.iter().collect();
    sorted.sort_by(|a, b| b.download_count.cmp(&a.download_count));

    let mut seen: HashSet<&str> = HashSet::new();
    sorted
        .into_iter()
        .filter(|f| seen.insert(f.title()))
        .take(10)
        .map(|f| DownloadCount {
            name: f.title().to_string(),
            downloads: f.download_count,
        })
        .collect()
}

/// Connected components over the implicit graph where files are nodes and
/// an edge joins two files sharing at least one tag. BFS from each
/// unvisited file; singleton components are dropped. Each cluster is
/// labelled with its most frequent tag, ties by first encounter.
pub fn tag_clusters(files: &[FileRecord]) -> Vec<TagCluster> {
    // Adjacency via tag buckets rather than pairwise comparison
    let mut by_tag: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, file) in files.iter().enumerate() {
        for tag in &file.tags {
            by_tag.entry(tag.as_str()).or_default().push(i);
        }
    }

    let mut visited = vec![false; files.len()];
    let mut clusters = Vec::new();

    for start in 0..files.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;

        let mut members = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for tag in &files[current].tags {
                for &neighbor in &by_tag[tag.as_str()] {
                    if !visited[neighbor] {
                        visited[neighbor] = true;
                        members.push(neighbor);
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        // Singleton components are not reported
        if members.len() < 2 {
            continue;
        }

        clusters.push(label_cluster(files, &members));
    }

    clusters
}

fn label_cluster(files: &[FileRecord], members: &[usize]) -> TagCluster {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for &i in members {
        for tag in &files[i].tags {
            let entry = counts.entry(tag.as_str()).or_insert(0);
            if *entry == 0 {
                order.push(tag.as_str());
            }
            *entry += 1;
        }
    }

    // First-encountered tag wins ties, so only a strictly higher count replaces
    let mut top_tag = "Misc";
    let mut top_count = 0;
    for tag in order {
        if counts[tag] > top_count {
            top_count = counts[tag];
            top_tag = tag;
        }
    }
    let top_tag = top_tag.to_string();

    TagCluster {
        top_tag,
        count: members.len(),
        files: members.iter().map(|&i| files[i].title().to_string()).collect(),
    }
}
