//! Zoom-aware density grouping for the markers endpoint.
//!
//! Markers are clustered in standardised coordinate space (zero mean, unit
//! variance per axis) with a neighbourhood radius that shrinks as the
//! client zooms in. A cluster needs a point plus at least one neighbour;
//! lone markers pass through as count-1 entries.

use std::collections::VecDeque;

use serde::Serialize;

use crate::map::data::MarkerRecord;

/// A point plus at least one neighbour forms a cluster.
pub(crate) const MIN_CLUSTER_SIZE: usize = 2;

/// Marker group rendered as a single count bubble on the page.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct MarkerCluster {
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    pub(crate) count: usize,
    pub(crate) photos: Vec<MarkerRecord>,
}

#[derive(Clone, Copy, PartialEq)]
enum Label {
    Unvisited,
    Noise,
    Cluster(usize),
}

/// Group markers for the given zoom level.
///
/// Clusters come first in discovery order, then unclustered markers in
/// input order. Fewer than two markers pass through unchanged.
pub(crate) fn cluster_markers(markers: &[MarkerRecord], zoom: u32) -> Vec<MarkerCluster> {
    if markers.len() < MIN_CLUSTER_SIZE {
        return markers.iter().map(singleton).collect();
    }

    let scaled = standardise(markers);
    let eps = neighbourhood_radius(zoom);

    let mut labels = vec![Label::Unvisited; markers.len()];
    let mut cluster_count = 0usize;

    for index in 0..markers.len() {
        if labels[index] != Label::Unvisited {
            continue;
        }
        let neighbours = region_query(&scaled, index, eps);
        if neighbours.len() < MIN_CLUSTER_SIZE {
            labels[index] = Label::Noise;
            continue;
        }

        let cluster = cluster_count;
        cluster_count += 1;
        labels[index] = Label::Cluster(cluster);

        let mut queue: VecDeque<usize> = neighbours.into_iter().collect();
        while let Some(candidate) = queue.pop_front() {
            match labels[candidate] {
                Label::Cluster(_) => continue,
                // A former noise point on a cluster edge joins the cluster
                // but does not expand it further.
                Label::Noise => {
                    labels[candidate] = Label::Cluster(cluster);
                    continue;
                }
                Label::Unvisited => {
                    labels[candidate] = Label::Cluster(cluster);
                    let reachable = region_query(&scaled, candidate, eps);
                    if reachable.len() >= MIN_CLUSTER_SIZE {
                        queue.extend(reachable);
                    }
                }
            }
        }
    }

    let mut clusters: Vec<Vec<&MarkerRecord>> = vec![Vec::new(); cluster_count];
    let mut unclustered: Vec<&MarkerRecord> = Vec::new();
    for (record, label) in markers.iter().zip(&labels) {
        match label {
            Label::Cluster(cluster) => clusters[*cluster].push(record),
            _ => unclustered.push(record),
        }
    }

    let mut result: Vec<MarkerCluster> = clusters.into_iter().map(centroid).collect();
    result.extend(unclustered.into_iter().map(singleton));
    result
}

/// Radius in standardised coordinate space for a given zoom level.
fn neighbourhood_radius(zoom: u32) -> f64 {
    (1.0 / (f64::from(zoom) + 1.0)).max(0.1)
}

/// Per-axis zero-mean unit-variance scaling; a zero-variance axis keeps
/// unit scale so identical points collapse to distance zero.
fn standardise(markers: &[MarkerRecord]) -> Vec<(f64, f64)> {
    let count = markers.len() as f64;
    let mean_lat = markers.iter().map(|m| m.latitude).sum::<f64>() / count;
    let mean_lon = markers.iter().map(|m| m.longitude).sum::<f64>() / count;
    let std_lat = axis_std(markers.iter().map(|m| m.latitude), mean_lat, count);
    let std_lon = axis_std(markers.iter().map(|m| m.longitude), mean_lon, count);

    markers
        .iter()
        .map(|m| {
            (
                (m.latitude - mean_lat) / std_lat,
                (m.longitude - mean_lon) / std_lon,
            )
        })
        .collect()
}

fn axis_std(values: impl Iterator<Item = f64>, mean: f64, count: f64) -> f64 {
    let variance = values.map(|value| (value - mean).powi(2)).sum::<f64>() / count;
    let std = variance.sqrt();
    if std == 0.0 { 1.0 } else { std }
}

/// Indices within `eps` of `index`, the point itself included.
fn region_query(scaled: &[(f64, f64)], index: usize, eps: f64) -> Vec<usize> {
    let (lat, lon) = scaled[index];
    scaled
        .iter()
        .enumerate()
        .filter(|(_, (other_lat, other_lon))| {
            ((other_lat - lat).powi(2) + (other_lon - lon).powi(2)).sqrt() <= eps
        })
        .map(|(other, _)| other)
        .collect()
}

fn centroid(members: Vec<&MarkerRecord>) -> MarkerCluster {
    let count = members.len();
    let latitude = members.iter().map(|m| m.latitude).sum::<f64>() / count as f64;
    let longitude = members.iter().map(|m| m.longitude).sum::<f64>() / count as f64;
    MarkerCluster {
        latitude,
        longitude,
        count,
        photos: members.into_iter().cloned().collect(),
    }
}

fn singleton(record: &MarkerRecord) -> MarkerCluster {
    MarkerCluster {
        latitude: record.latitude,
        longitude: record.longitude,
        count: 1,
        photos: vec![record.clone()],
    }
}
