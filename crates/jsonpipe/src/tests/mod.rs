mod property_multivalue;
