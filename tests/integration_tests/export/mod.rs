mod mod_roundtrip;
