mod select;
