pub mod dataset {
    pub mod domain {
        pub mod dataset;
        pub mod dataset_repository;
        pub mod face_dataset_store;
        pub mod identity;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod detected_face;
        pub mod face_detector;
        pub mod face_matcher;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod build_dataset_use_case;
    pub mod detection_snapshot;
    pub mod pipeline_logger;
}

pub mod sampling {
    pub mod frame_sampler;
    pub mod sample_interval;
}

pub mod settings;

pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod data_layout;
    pub mod file_naming;
    pub mod frame;
    pub mod glyphs;
    pub mod model_resolver;
    pub mod video_metadata;
}

pub mod video {
    pub mod domain {
        pub mod image_writer;
        pub mod video_source;
    }
    pub mod infrastructure;
}
