//! Unit tests for the job queue.
