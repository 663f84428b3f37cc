mod tests_editable_seq;
