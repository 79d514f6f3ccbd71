mod prop_import;
