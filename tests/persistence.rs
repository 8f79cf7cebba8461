use neuronet::{Activation, Error, Network, NetworkConfig, WeightInit};
use std::fs;

fn net(seed: u64) -> Network {
    Network::with_seed(&[6, 4], 3, 5, &NetworkConfig::default(), seed).unwrap()
}

#[test]
fn flat_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brain.txt");
    let original = net(1);
    original.save_network(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), original.parameter_count());
    // first neuron: bias then its five weights
    let first: Vec<f64> = text.lines().take(6).map(|l| l.parse().unwrap()).collect();
    let n0 = &original.layers()[0].neurons[0];
    assert_eq!(first[0], n0.bias);
    assert_eq!(&first[1..], n0.weights.as_slice());

    let mut restored = net(2);
    assert_ne!(restored, original);
    restored.load_network(&path).unwrap();
    assert_eq!(restored, original);
}

#[test]
fn legacy_single_precision_text_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.txt");
    let cfg = NetworkConfig::uniform(Activation::Tanh, WeightInit::default());
    let mut network = Network::with_seed(&[1], 1, 1, &cfg, 0).unwrap();
    fs::write(&path, "0.1\n-0.734521\n0.25\n1.5e-3\n").unwrap();
    network.load_network(&path).unwrap();
    let layers = network.layers();
    assert_eq!(layers[0].neurons[0].bias, 0.1);
    assert_eq!(layers[0].neurons[0].weights, vec![-0.734521]);
    assert_eq!(layers[1].neurons[0].bias, 0.25);
    assert_eq!(layers[1].neurons[0].weights, vec![1.5e-3]);
}

#[test]
fn truncated_or_oversized_file_leaves_network_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brain.txt");
    let source = net(1);
    source.save_network(&path).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    let mut target = net(3);
    let before = target.clone();

    fs::write(&path, lines[..lines.len() - 1].join("\n")).unwrap();
    let err = target.load_network(&path).unwrap_err();
    assert!(matches!(err, Error::WeightCount { found, expected } if found + 1 == expected));
    assert_eq!(target, before);

    fs::write(&path, format!("{text}0.5\n")).unwrap();
    assert!(matches!(target.load_network(&path), Err(Error::WeightCount { .. })));
    assert_eq!(target, before);

    fs::write(&path, text.replacen('\n', "\nnot-a-number\n", 1)).unwrap();
    assert!(matches!(target.load_network(&path), Err(Error::ParseWeight { line: 2, .. })));
    assert_eq!(target, before);
}

#[test]
fn non_finite_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brain.txt");
    let cfg = NetworkConfig::uniform(Activation::Tanh, WeightInit::default());
    let mut network = Network::with_seed(&[1], 1, 1, &cfg, 0).unwrap();
    let before = network.clone();

    for (text, line) in [
        ("NaN\ninf\n0.1\n0.2\n", 1),
        ("0.1\n0.2\n-inf\n0.3\n", 3),
        ("0.1\n0.2\n0.3\ninfinity\n", 4),
    ] {
        fs::write(&path, text).unwrap();
        let err = network.load_network(&path).unwrap_err();
        assert!(matches!(err, Error::ParseWeight { line: l, .. } if l == line), "{err}");
        assert_eq!(network, before);
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut network = net(1);
    let before = network.clone();
    assert!(matches!(
        network.load_network(dir.path().join("absent.txt")),
        Err(Error::Io { .. })
    ));
    assert_eq!(network, before);
    assert!(matches!(
        network.save_network(dir.path().join("no/such/dir/brain.txt")),
        Err(Error::Io { .. })
    ));
}

#[test]
fn checkpoint_restores_topology_and_weights() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("models").join("digits.json.gz");
    let cfg = NetworkConfig {
        hidden_activation: Activation::Sigmoid,
        ..NetworkConfig::default()
    };
    let original = Network::with_seed(&[7, 3], 4, 9, &cfg, 5).unwrap();
    original.save_checkpoint(&path).unwrap();

    let restored = Network::load_checkpoint(&path).unwrap();
    assert_eq!(restored, original);
    assert_eq!(restored.to_string(), "Network: [9, 7, 3, 4] (Sigmoid -> Softmax)");

    let input = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];
    assert_eq!(restored.predict(&input).unwrap(), original.predict(&input).unwrap());
}

#[test]
fn checkpoint_must_be_gzipped_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.txt");
    net(1).save_network(&path).unwrap();
    assert!(Network::load_checkpoint(&path).is_err());
}
