use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use damage_assess::buildings::BuildingSource;
use damage_assess::config::{
    CreateLabelingTaskConfig, GenerateExamplesConfig, LabelingConfig, LabelingImages, LabelsConfig,
};
use damage_assess::generate::{ExampleGenerator, ExecutionEngine, GenerationParams, GenerationRequest};
use damage_assess::labeling::{
    ExportRequest, JobSpec, LabelingImageExporter, LabelingService, NewPool, PoolSelection,
    PoolSpec, EUROPE_LABELING_REGION,
};
use damage_assess::labels::{ClassSchema, KeepLimit};
use damage_assess::open_street_map::BuildingFinder;
use damage_assess::pipeline::{
    run_create_labeling_task, run_generate_examples, run_labeling_task, Collaborators,
};
use damage_assess::{BuildingCentroid, Error, Region, Result};

struct FakeFinder(Vec<BuildingCentroid>);

#[async_trait]
impl BuildingFinder for FakeFinder {
    async fn building_centroids(&self, regions: &[Region]) -> Result<Vec<BuildingCentroid>> {
        assert!(!regions.is_empty());
        Ok(self.0.clone())
    }
}

/// Records requests and writes a manifest listing one image per coordinate
#[derive(Default)]
struct FakeGenerator {
    requests: Mutex<Vec<GenerationRequest>>,
}

#[async_trait]
impl ExampleGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<()> {
        let manifest = PathBuf::from(request.import_file_path());
        if let Some(parent) = manifest.parent() {
            fs::create_dir_all(parent)?;
        }
        let lines: Vec<String> = (0..request.coordinate_count())
            .map(|i| format!("gs://bucket/labeling_images/{}.png", i))
            .collect();
        fs::write(&manifest, lines.join("\n"))?;

        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }
}

#[derive(Default)]
struct FakeLabeling {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl LabelingService for FakeLabeling {
    async fn create_specialist_pool(&self, spec: &PoolSpec) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("pool {} {}", spec.region, spec.manager_emails.join(",")));
        Ok(format!("projects/{}/locations/{}/specialistPools/1", spec.project, spec.region))
    }

    async fn create_dataset(&self, project: &str, region: &str, _display_name: &str) -> Result<String> {
        self.calls.lock().unwrap().push(format!("dataset {}", region));
        Ok(format!("projects/{}/locations/{}/datasets/2", project, region))
    }

    async fn import_data(&self, _dataset: &str, _region: &str, import_file_uri: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("import {}", import_file_uri));
        Ok(())
    }

    async fn create_labeling_job(&self, _project: &str, region: &str, spec: &JobSpec) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("job {} {}", region, spec.class_names.join(",")));
        Ok(format!("projects/p/locations/{}/dataLabelingJobs/3", region))
    }
}

const AOI: &str = r#"{
  "type": "FeatureCollection",
  "features": [{
    "type": "Feature",
    "properties": {},
    "geometry": {
      "type": "Polygon",
      "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
    }
  }]
}"#;

const LABELS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"damage": "damaged"},
     "geometry": {"type": "Point", "coordinates": [10.0, 20.0]}},
    {"type": "Feature", "properties": {"damage": "collapsed"},
     "geometry": {"type": "Point", "coordinates": [11.0, 21.0]}},
    {"type": "Feature", "properties": {"damage": "undamaged"},
     "geometry": {"type": "Point", "coordinates": [12.0, 22.0]}}
  ]
}"#;

const NO_MATCHING_LABELS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"damage": "collapsed"},
     "geometry": {"type": "Point", "coordinates": [10.0, 20.0]}}
  ]
}"#;

/// Records export requests and reports the manifest inside the images directory
#[derive(Default)]
struct FakeExporter {
    requests: Mutex<Vec<ExportRequest>>,
}

#[async_trait]
impl LabelingImageExporter for FakeExporter {
    async fn export(&self, request: &ExportRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(request.import_file_path())
    }
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn classes() -> ClassSchema {
    ClassSchema::new(["undamaged", "damaged"]).unwrap()
}

fn base_config(output_dir: &Path) -> GenerateExamplesConfig {
    GenerateExamplesConfig {
        before_image_path: "gs://bucket/before.tif".to_string(),
        after_image_path: "gs://bucket/after.tif".to_string(),
        output_dir: output_dir.display().to_string(),
        aoi_path: None,
        params: GenerationParams::default(),
        engine: ExecutionEngine::Local,
        engine_command: "unused".to_string(),
        raster_env: BTreeMap::new(),
        buildings: BuildingSource::None,
        labels: None,
        labeling: None,
    }
}

fn labeling_config(location: &str) -> LabelingConfig {
    LabelingConfig {
        project: "p".to_string(),
        location: location.to_string(),
        dataset_name: "quake".to_string(),
        pool: PoolSelection::Create(
            NewPool::from_emails(&["lead@x.com".to_string(), "b@x.com".to_string()]).unwrap(),
        ),
        instructions_uri: "gs://bucket/instructions.pdf".to_string(),
        inputs_schema_uri: "gs://bucket/schema.yaml".to_string(),
        class_names: classes().names().to_vec(),
    }
}

#[tokio::test]
async fn test_labels_only_run_has_no_buildings() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.labels = Some(LabelsConfig {
        path: write(dir.path(), "labels.geojson", LABELS),
        property: "damage".to_string(),
        classes: classes(),
        keep: KeepLimit::All,
    });

    let finder = FakeFinder(vec![BuildingCentroid::new(0.5, 0.5)]);
    let generator = FakeGenerator::default();
    let summary = run_generate_examples(
        &config,
        &Collaborators { buildings: &finder, generator: &generator, labeling: None },
    )
    .await
    .unwrap();

    assert_eq!(summary.building_count, 0);
    assert_eq!(summary.labeled_count, 2);
    assert!(summary.labeling_job.is_none());

    let requests = generator.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let labels: Vec<f64> = requests[0].labeled_coordinates.iter().map(|c| c.label).collect();
    assert_eq!(labels, [1.0, 0.0]);
}

#[tokio::test]
async fn test_nothing_to_generate_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.labels = Some(LabelsConfig {
        path: write(dir.path(), "labels.geojson", NO_MATCHING_LABELS),
        property: "damage".to_string(),
        classes: classes(),
        keep: KeepLimit::All,
    });

    let finder = FakeFinder(Vec::new());
    let generator = FakeGenerator::default();
    let err = run_generate_examples(
        &config,
        &Collaborators { buildings: &finder, generator: &generator, labeling: None },
    )
    .await
    .unwrap_err();

    assert!(err.is_config());
    assert!(generator.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_labels_file_is_config_error() {
    for contents in [r#"{"type": "FeatureCollection", "features": []}"#, ""] {
        let dir = tempfile::tempdir().unwrap();
        let mut config = base_config(dir.path());
        config.labels = Some(LabelsConfig {
            path: write(dir.path(), "labels.geojson", contents),
            property: "damage".to_string(),
            classes: classes(),
            keep: KeepLimit::All,
        });

        let finder = FakeFinder(Vec::new());
        let generator = FakeGenerator::default();
        let err = run_generate_examples(
            &config,
            &Collaborators { buildings: &finder, generator: &generator, labeling: None },
        )
        .await
        .unwrap_err();

        assert!(err.is_config(), "{:?}", err);
        assert!(err.to_string().contains("No work to do"));
        assert!(generator.requests.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_full_run_with_labeling_task() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(&dir.path().join("out"));
    config.aoi_path = Some(write(dir.path(), "aoi.geojson", AOI));
    config.buildings = BuildingSource::OpenStreetMap {
        overpass_url: "http://overpass.invalid".to_string(),
    };
    config.labeling = Some(labeling_config("europe-west1"));

    let finder = FakeFinder(vec![BuildingCentroid::new(0.2, 0.3), BuildingCentroid::new(0.7, 0.1)]);
    let generator = FakeGenerator::default();
    let labeling = FakeLabeling::default();
    let summary = run_generate_examples(
        &config,
        &Collaborators { buildings: &finder, generator: &generator, labeling: Some(&labeling) },
    )
    .await
    .unwrap();

    assert_eq!(summary.building_count, 2);
    assert!(summary.import_file.ends_with("examples/labeling_images/import_file.csv"));

    let job = summary.labeling_job.unwrap();
    assert_eq!(job.region, EUROPE_LABELING_REGION);
    assert_eq!(job.name, "projects/p/locations/europe-west4/dataLabelingJobs/3");

    let calls = labeling.calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec![
            "pool europe-west1 lead@x.com".to_string(),
            "dataset europe-west4".to_string(),
            format!("import {}", summary.import_file),
            "job europe-west4 undamaged,damaged".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_labeling_requires_service() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.aoi_path = Some(write(dir.path(), "aoi.geojson", AOI));
    config.buildings = BuildingSource::OpenStreetMap {
        overpass_url: "http://overpass.invalid".to_string(),
    };
    config.labeling = Some(labeling_config("us-east1"));

    let finder = FakeFinder(vec![BuildingCentroid::new(0.2, 0.3)]);
    let generator = FakeGenerator::default();
    let err = run_generate_examples(
        &config,
        &Collaborators { buildings: &finder, generator: &generator, labeling: None },
    )
    .await
    .unwrap_err();

    assert!(err.is_config());
}

#[tokio::test]
async fn test_labeling_task_with_existing_pool() {
    let mut config = labeling_config("asia-east1");
    config.pool = PoolSelection::Existing("projects/p/locations/us-central1/specialistPools/9".to_string());

    let labeling = FakeLabeling::default();
    let job = run_labeling_task(&config, "gs://bucket/import_file.csv", &labeling)
        .await
        .unwrap();

    assert_eq!(job.region, "us-central1");
    let calls = labeling.calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|call| !call.starts_with("pool")));
}

#[tokio::test]
async fn test_generation_failure_stops_run() {
    struct FailingGenerator;

    #[async_trait]
    impl ExampleGenerator for FailingGenerator {
        async fn generate(&self, _request: &GenerationRequest) -> Result<()> {
            Err(Error::Engine("worker crashed".to_string()))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.aoi_path = Some(write(dir.path(), "aoi.geojson", AOI));
    config.buildings = BuildingSource::OpenStreetMap {
        overpass_url: "http://overpass.invalid".to_string(),
    };
    config.labeling = Some(labeling_config("us-central1"));

    let finder = FakeFinder(vec![BuildingCentroid::new(0.2, 0.3)]);
    let labeling = FakeLabeling::default();
    let err = run_generate_examples(
        &config,
        &Collaborators { buildings: &finder, generator: &FailingGenerator, labeling: Some(&labeling) },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Engine(_)));
    assert!(labeling.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_new_pool_stays_in_project_region() {
    let labeling = FakeLabeling::default();
    let job = run_labeling_task(&labeling_config("us-west1"), "gs://bucket/import_file.csv", &labeling)
        .await
        .unwrap();

    assert_eq!(job.region, "us-central1");
    let calls = labeling.calls.lock().unwrap();
    assert_eq!(calls[0], "pool us-west1 lead@x.com");
    assert_eq!(calls[1], "dataset us-central1");
}

#[tokio::test]
async fn test_labeling_only_run_exports_images() {
    let config = CreateLabelingTaskConfig {
        images: LabelingImages::Export(ExportRequest {
            examples_pattern: "gs://bucket/examples/unlabeled/*.tfrecord".to_string(),
            images_dir: "gs://bucket/labeling-images".to_string(),
            max_images: 100,
            randomize: true,
        }),
        export_command: "unused".to_string(),
        labeling: labeling_config("europe-west2"),
    };

    let exporter = FakeExporter::default();
    let labeling = FakeLabeling::default();
    let job = run_create_labeling_task(&config, &exporter, &labeling).await.unwrap();

    assert_eq!(job.region, EUROPE_LABELING_REGION);
    assert_eq!(exporter.requests.lock().unwrap().len(), 1);
    let calls = labeling.calls.lock().unwrap();
    assert!(calls.contains(&"import gs://bucket/labeling-images/import_file.csv".to_string()));
}

#[tokio::test]
async fn test_labeling_only_run_with_import_file_skips_export() {
    let config = CreateLabelingTaskConfig {
        images: LabelingImages::Existing("gs://bucket/existing/import_file.csv".to_string()),
        export_command: "unused".to_string(),
        labeling: labeling_config("us-central1"),
    };

    let exporter = FakeExporter::default();
    let labeling = FakeLabeling::default();
    run_create_labeling_task(&config, &exporter, &labeling).await.unwrap();

    assert!(exporter.requests.lock().unwrap().is_empty());
    let calls = labeling.calls.lock().unwrap();
    assert!(calls.contains(&"import gs://bucket/existing/import_file.csv".to_string()));
}
