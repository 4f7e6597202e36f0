use versed_core::error::Error;
use versed_core::traits::Embedder;
use versed_embed::HashEmbedder;

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn hash_embedder_is_deterministic() {
    let embedder = HashEmbedder::new(64, 8);
    let input = texts(&["let there be light", "and there was light"]);

    let first = embedder.embed(&input).await.expect("embed");
    let second = embedder.embed(&input).await.expect("embed again");
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn vectors_have_configured_dim_and_unit_norm() {
    let embedder = HashEmbedder::new(32, 8);
    let vectors = embedder.embed(&texts(&["in the beginning"])).await.expect("embed");

    assert_eq!(vectors[0].len(), 32);
    assert_eq!(vectors[0].len(), embedder.dim());
    let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-4, "expected unit norm, got {norm}");
}

#[tokio::test]
async fn distinct_texts_get_distinct_vectors() {
    let embedder = HashEmbedder::new(64, 8);
    let vectors = embedder
        .embed(&texts(&["heaven and earth", "forty days and forty nights"]))
        .await
        .expect("embed");
    assert_ne!(vectors[0], vectors[1]);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let embedder = HashEmbedder::new(16, 4);
    let err = embedder.embed(&[]).await.unwrap_err();
    assert!(matches!(err, Error::EmptyInput(_)));
}

#[tokio::test]
async fn oversized_batch_is_rejected_not_split() {
    let embedder = HashEmbedder::new(16, 2);
    let input = texts(&["a", "b", "c"]);
    let err = embedder.embed(&input).await.unwrap_err();
    assert!(matches!(err, Error::ProviderLimit { got: 3, max: 2 }));
}
