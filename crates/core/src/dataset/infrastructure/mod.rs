pub mod fs_dataset_repository;
