// End-to-end tests of extraction, grouping and matching over in-memory images

mod common;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use albumsift::core::{AbortFlag, ClusterParams, ClusterReport, Embedding};
use albumsift::error::EngineError;
use albumsift::config::EmbedConfig;
use albumsift::processing::{
	cluster, create_representative, find_matches, scan_directory, Extractor, FsSource, MatchParams,
};
use albumsift::storage::{self, RepresentativeFile};
use common::{scored, solid_png, Gate, Library, LookupModel};

#[test]
fn embeddings_are_unit_length_with_exact_progress() {
	let mut lib = Library::default();
	for key in 1..=12u8 {
		lib = lib.image(key * 10, vec![key as f32, 3.0, -2.0 * key as f32]);
	}
	let (extractor, refs) = lib.extractor(3);

	let mut seen = Vec::new();
	let batch = extractor
		.embed_many(&refs, &AbortFlag::new(), |done, total| {
			assert_eq!(total, 12);
			seen.push(done);
		})
		.unwrap();

	assert_eq!(seen, (1..=12).collect::<Vec<_>>());
	assert_eq!(batch.len(), 12);
	assert!(!batch.is_partial());
	for e in &batch.embeddings {
		assert!((e.norm() - 1.0).abs() < 1e-5);
	}
	for (image, embedding) in batch.refs.iter().zip(&batch.embeddings) {
		assert_eq!(*embedding, extractor.embed(image).unwrap());
	}
}

#[test]
fn failed_items_are_skipped() {
	let (extractor, refs) = Library::default()
		.image(10, vec![1.0, 0.0])
		.corrupt("broken.png")
		.image(20, vec![0.0, 1.0])
		.missing("gone.png")
		.extractor(2);

	let batch = extractor.embed_many(&refs, &AbortFlag::new(), |_, _| {}).unwrap();
	assert_eq!(batch.len(), 2);
	assert_eq!(batch.requested, 4);
	assert!(batch.is_partial());

	let mut failed: Vec<&str> = batch.failed.iter().map(|(r, _)| r.id.as_str()).collect();
	failed.sort_unstable();
	assert_eq!(failed, vec!["broken.png", "gone.png"]);
}

#[test]
fn all_failures_produce_no_embeddings_error() {
	let (extractor, refs) = Library::default().corrupt("a.png").missing("b.png").extractor(2);
	let err = extractor.embed_many(&refs, &AbortFlag::new(), |_, _| {}).unwrap_err();
	assert!(matches!(err, EngineError::NoEmbeddingsProduced { requested: 2 }));
}

#[test]
fn close_pair_groups_and_outlier_stays_alone() {
	// e0·e1 = 0.9, e0·e2 = e1·e2 = 0.3
	let y1 = (1.0f32 - 0.81).sqrt();
	let y2 = (0.3 - 0.27) / y1;
	let (extractor, refs) = Library::default()
		.image(10, vec![1.0, 0.0, 0.0])
		.image(20, vec![0.9, y1, 0.0])
		.image(30, vec![0.3, y2, (1.0 - 0.09 - y2 * y2).sqrt()])
		.extractor(1);

	let batch = extractor.embed_many(&refs, &AbortFlag::new(), |_, _| {}).unwrap();
	let params = ClusterParams {
		threshold: 0.7,
		min_cluster_size: 2,
	};
	let clustering = cluster(&batch.refs, &batch.embeddings, &params).unwrap();
	let report = ClusterReport::new(params, clustering, &batch.refs, 0);

	assert_eq!(report.clusters.len(), 1);
	let mut ids: Vec<&str> = report.clusters[0].member_refs.iter().map(|r| r.id.as_str()).collect();
	ids.sort_unstable();
	assert_eq!(ids, vec!["id10", "id20"]);
	assert_eq!(report.unclustered.len(), 1);
	assert_eq!(report.unclustered[0].id, "id30");
	assert_eq!(report.total_images, 3);
}

#[test]
fn copied_photos_on_disk_group_together() {
	let dir = tempfile::tempdir().unwrap();
	std::fs::write(dir.path().join("beach.png"), solid_png(5)).unwrap();
	std::fs::write(dir.path().join("beach copy.png"), solid_png(5)).unwrap();
	std::fs::write(dir.path().join("forest.png"), solid_png(9)).unwrap();

	let scan = scan_directory(dir.path(), false).unwrap();
	assert_eq!(scan.images.len(), 3);

	let model = LookupModel::default().with(5, vec![1.0, 0.0]).with(9, vec![0.0, 1.0]);
	let extractor = Extractor::new(Arc::new(FsSource), Arc::new(model)).with_config(EmbedConfig {
		input_size: 16,
		..EmbedConfig::default()
	});
	let batch = extractor.embed_many(&scan.images, &AbortFlag::new(), |_, _| {}).unwrap();
	let clustering = cluster(&batch.refs, &batch.embeddings, &ClusterParams::default()).unwrap();

	assert_eq!(clustering.groups.len(), 1);
	let mut names: Vec<&str> = clustering.groups[0].member_refs.iter().map(|r| r.file_name()).collect();
	names.sort_unstable();
	assert_eq!(names, vec!["beach copy.png", "beach.png"]);
}

#[test]
fn identical_training_images_reproduce_their_embedding() {
	let vector = vec![0.3, -0.4, 0.5, 0.1];
	let mut lib = Library::default();
	for key in 1..=10u8 {
		lib = lib.image(key, vector.clone());
	}
	let (extractor, refs) = lib.extractor(4);

	let (rep, batch) = create_representative(&refs, &extractor, &AbortFlag::new(), |_, _| {}).unwrap();
	assert_eq!(batch.len(), 10);
	let expected = Embedding::new(vector);
	for (a, b) in rep.as_slice().iter().zip(expected.as_slice()) {
		assert!((a - b).abs() < 1e-6);
	}

	let (again, _) = create_representative(&refs, &extractor, &AbortFlag::new(), |_, _| {}).unwrap();
	assert_eq!(rep, again);
}

#[test]
fn empty_training_set_is_rejected() {
	let (extractor, _) = Library::default().extractor(1);
	let err = create_representative(&[], &extractor, &AbortFlag::new(), |_, _| {}).unwrap_err();
	assert!(matches!(err, EngineError::EmptyTrainingSet));
}

#[test]
fn only_candidates_above_threshold_match() {
	let (extractor, refs) = Library::default()
		.image(1, scored(0.1))
		.image(2, scored(0.5))
		.image(3, scored(0.79))
		.image(4, scored(0.81))
		.image(5, scored(-0.6))
		.extractor(3);

	let rep = Embedding::new(vec![1.0, 0.0]);
	let params = MatchParams {
		threshold: 0.8,
		concurrency: 3,
	};
	let matches = find_matches(&refs, &rep, &extractor, &params, &AbortFlag::new(), |_, _| {}).unwrap();

	assert_eq!(matches.len(), 1);
	assert_eq!(matches[0].image.id, "id4");
	assert!((matches[0].score - 0.81).abs() < 1e-5);
}

#[test]
fn dimension_mismatch_fails_matching() {
	let (extractor, refs) = Library::default().image(1, vec![1.0, 0.0, 0.0]).extractor(1);
	let rep = Embedding::new(vec![1.0, 0.0]);
	let err = find_matches(&refs, &rep, &extractor, &MatchParams::default(), &AbortFlag::new(), |_, _| {})
		.unwrap_err();
	assert!(matches!(err, EngineError::InvalidEmbeddingInput(_)));
}

#[test]
fn abort_stops_matching_early() {
	let abort = AbortFlag::new();
	let mut lib = Library::default().gated(Gate {
		from_key: 2,
		open: Arc::new(AtomicBool::new(false)),
		abort: Some(abort.clone()),
	});
	for key in 0..10u8 {
		lib = lib.image(key, scored(0.9));
	}
	let (extractor, refs) = lib.extractor(1);

	let params = MatchParams {
		threshold: 0.5,
		concurrency: 1,
	};
	let mut last = 0;
	let result = find_matches(&refs, &Embedding::new(vec![1.0, 0.0]), &extractor, &params, &abort, |done, _| {
		last = done;
		if done == 2 {
			abort.abort();
		}
	});

	assert!(matches!(result, Err(EngineError::Aborted)));
	assert!(result.unwrap_err().is_aborted());
	assert!((2..=3).contains(&last));
}

#[test]
fn saved_album_scores_like_the_live_one() {
	let dir = tempfile::tempdir().unwrap();
	let (extractor, refs) = Library::default()
		.image(1, vec![1.0, 0.1])
		.image(2, vec![0.9, 0.2])
		.image(3, scored(0.2))
		.extractor(2);

	let (rep, batch) = create_representative(&refs[..2], &extractor, &AbortFlag::new(), |_, _| {}).unwrap();
	let ids = batch.refs.iter().map(|r| r.id.clone()).collect();
	storage::save(&RepresentativeFile::new("pair", &rep, ids, extractor.config), dir.path()).unwrap();

	let album = storage::load(dir.path(), "pair").unwrap();
	album.ensure_compatible(&extractor.config).unwrap();
	assert_eq!(album.training_count, 2);

	let params = MatchParams {
		threshold: 0.9,
		concurrency: 2,
	};
	let live = find_matches(&refs, &rep, &extractor, &params, &AbortFlag::new(), |_, _| {}).unwrap();
	let stored = find_matches(&refs, &album.embedding(), &extractor, &params, &AbortFlag::new(), |_, _| {}).unwrap();

	let ids = |m: &[albumsift::processing::Match]| {
		let mut v: Vec<String> = m.iter().map(|x| x.image.id.clone()).collect();
		v.sort();
		v
	};
	assert_eq!(ids(&live), ids(&stored));
	assert_eq!(ids(&live), vec!["id1".to_string(), "id2".to_string()]);
}
