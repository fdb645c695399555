// Backend Test Suite
// Organized by pipeline stage

#[cfg(test)]
mod fixtures;












#[cfg(test)]
mod summary_tests;

#[cfg(test)]
mod pipeline_tests;
