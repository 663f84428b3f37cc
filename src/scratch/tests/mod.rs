mod tests_scratch_log;
