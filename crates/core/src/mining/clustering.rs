//! Lexical item clustering: TF-IDF vectors over item names, grouped with
//! seeded k-means so identical input always yields identical clusters.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const MIN_ITEMS_FOR_CLUSTERING: usize = 3;
pub const MAX_VOCABULARY: usize = 100;
const MAX_ITERATIONS: usize = 300;

const ENGLISH_STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "either",
    "every", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "him", "his", "how", "if", "in", "into", "is", "it", "its", "just", "least", "less",
    "many", "me", "more", "most", "much", "must", "my", "no", "nor", "not", "now", "of", "off",
    "on", "once", "one", "only", "or", "other", "our", "ours", "out", "over", "own", "per",
    "same", "she", "should", "so", "some", "such", "than", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "those", "through", "to", "too", "two", "under", "until",
    "up", "upon", "us", "very", "was", "we", "were", "what", "when", "where", "which", "while",
    "who", "whom", "why", "will", "with", "within", "without", "would", "yet", "you", "your",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCluster {
    pub cluster_id: usize,
    pub members: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterModel {
    pub clusters: Vec<ItemCluster>,
    assignments: BTreeMap<String, usize>,
}

impl ClusterModel {
    /// Build a model from explicit clusters. Later clusters win for items listed twice.
    pub fn from_clusters(clusters: Vec<ItemCluster>) -> Self {
        let assignments = clusters
            .iter()
            .flat_map(|cluster| {
                cluster.members.iter().map(move |member| (member.clone(), cluster.cluster_id))
            })
            .collect();
        Self { clusters, assignments }
    }

    pub fn cluster_of(&self, item: &str) -> Option<&ItemCluster> {
        let cluster_id = *self.assignments.get(item)?;
        self.clusters.iter().find(|cluster| cluster.cluster_id == cluster_id)
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

/// Number of clusters for `item_count` distinct items: `n / 3` bounded to 2..=5.
pub fn cluster_count(item_count: usize) -> usize {
    (item_count / 3).clamp(2, 5)
}

/// Cluster distinct item names. Returns `None` when there are too few items.
pub fn cluster_items<'a>(items: impl IntoIterator<Item = &'a str>, seed: u64) -> Option<ClusterModel> {
    let items: Vec<String> =
        items.into_iter().map(str::to_owned).collect::<BTreeSet<_>>().into_iter().collect();
    if items.len() < MIN_ITEMS_FOR_CLUSTERING {
        return None;
    }

    let vectorizer = TfidfVectorizer::fit(&items, MAX_VOCABULARY);
    let vectors: Vec<Vec<f64>> = items.iter().map(|item| vectorizer.transform(item)).collect();
    let assignments = kmeans(&vectors, cluster_count(items.len()), seed);

    // Relabel so the cluster holding the alphabetically first item is 0, and so on.
    let mut relabel: BTreeMap<usize, usize> = BTreeMap::new();
    let mut clusters: Vec<ItemCluster> = Vec::new();
    let mut by_item = BTreeMap::new();
    for (item, raw_label) in items.iter().zip(assignments) {
        let next_id = relabel.len();
        let cluster_id = *relabel.entry(raw_label).or_insert(next_id);
        if cluster_id == clusters.len() {
            clusters.push(ItemCluster { cluster_id, members: Vec::new() });
        }
        clusters[cluster_id].members.push(item.clone());
        by_item.insert(item.clone(), cluster_id);
    }

    Some(ClusterModel { clusters, assignments: by_item })
}

/// Word-level TF-IDF with smoothed IDF and L2-normalised rows.
#[derive(Clone, Debug, PartialEq)]
pub struct TfidfVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn fit(documents: &[String], max_features: usize) -> Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|doc| tokenize(doc)).collect();

        let mut term_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &tokenized {
            for token in tokens {
                *term_frequency.entry(token.as_str()).or_insert(0) += 1;
            }
            for token in tokens.iter().map(String::as_str).collect::<BTreeSet<_>>() {
                *document_frequency.entry(token).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = term_frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(max_features);

        let mut kept: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort_unstable();

        let document_count = documents.len() as f64;
        let idf = kept
            .iter()
            .map(|term| {
                let df = document_frequency.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + document_count) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        let vocabulary =
            kept.into_iter().enumerate().map(|(index, term)| (term.to_owned(), index)).collect();

        Self { vocabulary, idf }
    }

    pub fn transform(&self, document: &str) -> Vec<f64> {
        let mut vector = vec![0.0; self.vocabulary.len()];
        for token in tokenize(document) {
            if let Some(&index) = self.vocabulary.get(&token) {
                vector[index] += self.idf[index];
            }
        }

        let norm = vector.iter().map(|value| value * value).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Lowercased alphanumeric runs of two or more characters, minus stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .filter(|token| !ENGLISH_STOP_WORDS.contains(token))
        .map(str::to_owned)
        .collect()
}

fn kmeans(vectors: &[Vec<f64>], k: usize, seed: u64) -> Vec<usize> {
    let k = k.min(vectors.len()).max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = kmeans_plus_plus(vectors, k, &mut rng);
    let mut assignments: Vec<usize> = Vec::new();

    for _ in 0..MAX_ITERATIONS {
        let next: Vec<usize> =
            vectors.iter().map(|vector| nearest_centroid(vector, &centroids)).collect();
        if next == assignments {
            break;
        }
        assignments = next;

        for (cluster, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&Vec<f64>> = vectors
                .iter()
                .zip(&assignments)
                .filter(|(_, assigned)| **assigned == cluster)
                .map(|(vector, _)| vector)
                .collect();
            // An emptied cluster keeps its previous centroid.
            if !members.is_empty() {
                *centroid = mean(&members);
            }
        }
    }

    assignments
}

fn kmeans_plus_plus(vectors: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut chosen = vec![rng.gen_range(0..vectors.len())];

    while chosen.len() < k {
        let distances: Vec<f64> = vectors
            .iter()
            .map(|vector| {
                chosen
                    .iter()
                    .map(|&index| squared_distance(vector, &vectors[index]))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = distances.iter().sum();

        let next = if total > 0.0 {
            let threshold = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut pick = None;
            for (index, distance) in distances.iter().enumerate() {
                cumulative += distance;
                if *distance > 0.0 && cumulative >= threshold {
                    pick = Some(index);
                    break;
                }
            }
            pick.or_else(|| distances.iter().rposition(|distance| *distance > 0.0))
        } else {
            None
        };

        // Every remaining point coincides with a centroid; take the next unused index.
        let next = next.or_else(|| (0..vectors.len()).find(|index| !chosen.contains(index)));
        match next {
            Some(index) => chosen.push(index),
            None => break,
        }
    }

    chosen.into_iter().map(|index| vectors[index].clone()).collect()
}

fn nearest_centroid(vector: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(vector, centroid);
        if distance < best_distance {
            best_distance = distance;
            best = index;
        }
    }
    best
}

fn squared_distance(left: &[f64], right: &[f64]) -> f64 {
    left.iter().zip(right).map(|(a, b)| (a - b) * (a - b)).sum()
}

fn mean(members: &[&Vec<f64>]) -> Vec<f64> {
    let dimensions = members.first().map(|vector| vector.len()).unwrap_or(0);
    let mut sum = vec![0.0; dimensions];
    for vector in members {
        for (slot, value) in sum.iter_mut().zip(vector.iter()) {
            *slot += value;
        }
    }
    let count = members.len() as f64;
    sum.into_iter().map(|value| value / count).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{cluster_count, cluster_items, tokenize, TfidfVectorizer};

    const GROCERIES: &[&str] = &[
        "whole milk",
        "skim milk",
        "oat milk",
        "cheddar cheese",
        "swiss cheese",
        "goat cheese",
        "sourdough bread",
        "rye bread",
        "banana bread",
    ];

    #[test]
    fn cluster_count_is_bounded() {
        assert_eq!(cluster_count(3), 2);
        assert_eq!(cluster_count(9), 3);
        assert_eq!(cluster_count(14), 4);
        assert_eq!(cluster_count(40), 5);
    }

    #[test]
    fn tokenizer_drops_stop_words_and_single_characters() {
        assert_eq!(tokenize("The Best-of 2% Milk"), vec!["best", "milk"]);
    }

    #[test]
    fn vectors_are_unit_length_and_vocabulary_is_bounded() {
        let documents: Vec<String> = (0..150).map(|index| format!("item{index} snack")).collect();
        let vectorizer = TfidfVectorizer::fit(&documents, 100);

        assert_eq!(vectorizer.vocabulary_size(), 100);
        let vector = vectorizer.transform("snack");
        let norm: f64 = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
        assert!(vectorizer.transform("unknown words").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn too_few_items_skip_clustering() {
        assert!(cluster_items(["milk", "bread"], 42).is_none());
        assert!(cluster_items(["milk", "milk", "bread"], 42).is_none());
    }

    #[test]
    fn clusters_partition_distinct_items() {
        let model = cluster_items(GROCERIES.iter().copied(), 42).expect("clusters");

        let mut seen = BTreeSet::new();
        for cluster in &model.clusters {
            assert!(!cluster.members.is_empty());
            for member in &cluster.members {
                assert!(seen.insert(member.clone()), "{member} appears in two clusters");
                assert_eq!(model.cluster_of(member).map(|c| c.cluster_id), Some(cluster.cluster_id));
            }
        }
        assert_eq!(seen.len(), GROCERIES.len());
        assert!(model.len() <= cluster_count(GROCERIES.len()));
        assert_eq!(model.cluster_of("banana bread").map(|c| c.cluster_id), Some(0));
    }

    #[test]
    fn same_seed_gives_same_clusters() {
        let first = cluster_items(GROCERIES.iter().copied(), 7);
        let second = cluster_items(GROCERIES.iter().rev().copied(), 7);

        assert_eq!(first, second);
    }

    #[test]
    fn names_differing_only_in_stop_words_cluster_together() {
        let items = ["milk", "the milk", "a milk", "cheese", "the cheese", "some cheese"];
        let model = cluster_items(items, 42).expect("clusters");

        assert_eq!(model.len(), 2);
        let milk = model.cluster_of("milk").unwrap();
        let cheese = model.cluster_of("cheese").unwrap();
        assert_ne!(milk.cluster_id, cheese.cluster_id);
        assert_eq!(milk.members, vec!["a milk", "milk", "the milk"]);
        assert_eq!(cheese.members, vec!["cheese", "some cheese", "the cheese"]);
    }
}
